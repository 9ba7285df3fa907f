//! Fixed-point `${key}` interpolation over a [`ConfigurationStore`].
//!
//! Each pass walks every key once. For a value holding tokens, every
//! referenced key is looked up in the store, then in the environment
//! fallback:
//!
//! ```text
//! found, no tokens in it   → resolved: substituted this pass
//! found, still has tokens  → pending:  pass is incomplete, retry next pass
//! not found anywhere       → absent:   token left verbatim, no error
//! ```
//!
//! Passes repeat while any reference is pending. Two guards replace the
//! unbounded looping of the classic launcher behaviour:
//!
//! - a pass that is incomplete but rewrote nothing cannot make progress
//!   later either, so it fails with [`InterpolationError::Stalled`]
//!   (cycles, self references, chains ending at an absent key);
//! - after [`Resolver::max_passes`] incomplete passes it fails with
//!   [`InterpolationError::DidNotConverge`].
//!
//! Substitutions made before an error stay in the store.

pub mod placeholder;

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{debug, trace};

use crate::env::EnvironmentFallback;
use crate::store::ConfigurationStore;

use placeholder::{contains_placeholder, referenced_keys, token};

/// Pass ceiling used by [`resolve`] and `Resolver::default()`.
pub const DEFAULT_MAX_PASSES: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterpolationError {
    /// An incomplete pass rewrote no value; further passes would repeat it.
    #[error("interpolation stalled after {passes} pass(es); pending: {}", .pending.join(", "))]
    Stalled { passes: usize, pending: Vec<String> },

    /// The pass ceiling was reached with references still pending.
    #[error("interpolation did not converge after {passes} passes; pending: {}", .pending.join(", "))]
    DidNotConverge { passes: usize, pending: Vec<String> },
}

impl InterpolationError {
    pub fn passes(&self) -> usize {
        match self {
            Self::Stalled { passes, .. } | Self::DidNotConverge { passes, .. } => *passes,
        }
    }

    /// Store keys whose values still referenced pending keys on the last pass.
    pub fn pending(&self) -> &[String] {
        match self {
            Self::Stalled { pending, .. } | Self::DidNotConverge { pending, .. } => pending,
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Passes run, including the final one that found nothing pending.
    pub passes: usize,
    /// Referenced keys substituted, counted once per value per pass.
    pub substitutions: usize,
    /// Keys still referenced by some value but found in neither source.
    pub unresolved: BTreeSet<String>,
}

/// Interpolation engine with a configurable pass ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    max_passes: usize,
}

impl Default for Resolver {
    fn default() -> Self {
        Self { max_passes: DEFAULT_MAX_PASSES }
    }
}

impl Resolver {
    /// `max_passes` below 1 is raised to 1.
    pub fn new(max_passes: usize) -> Self {
        Self { max_passes: max_passes.max(1) }
    }

    pub fn max_passes(&self) -> usize {
        self.max_passes
    }

    /// Run passes over `store` until nothing is pending.
    pub fn resolve<E>(
        &self,
        store: &mut ConfigurationStore,
        env: &E,
    ) -> Result<Resolution, InterpolationError>
    where
        E: EnvironmentFallback + ?Sized,
    {
        let mut substitutions = 0;
        let mut pending = Vec::new();

        for pass in 1..=self.max_passes {
            let outcome = run_pass(store, env);
            substitutions += outcome.substitutions;
            trace!(
                pass,
                rewritten = outcome.rewritten,
                pending = outcome.pending.len(),
                "interpolation pass"
            );

            if outcome.pending.is_empty() {
                let unresolved = unresolved_keys(store, env);
                debug!(
                    passes = pass,
                    substitutions,
                    unresolved = unresolved.len(),
                    "interpolation converged"
                );
                return Ok(Resolution { passes: pass, substitutions, unresolved });
            }
            if outcome.rewritten == 0 {
                return Err(InterpolationError::Stalled { passes: pass, pending: outcome.pending });
            }
            pending = outcome.pending;
        }

        Err(InterpolationError::DidNotConverge { passes: self.max_passes, pending })
    }
}

/// Resolve `store` in place with the default pass ceiling.
pub fn resolve<E>(store: &mut ConfigurationStore, env: &E) -> Result<Resolution, InterpolationError>
where
    E: EnvironmentFallback + ?Sized,
{
    Resolver::default().resolve(store, env)
}

#[derive(Debug, Default)]
struct PassOutcome {
    rewritten: usize,
    substitutions: usize,
    pending: Vec<String>,
}

fn run_pass<E>(store: &mut ConfigurationStore, env: &E) -> PassOutcome
where
    E: EnvironmentFallback + ?Sized,
{
    let mut outcome = PassOutcome::default();
    let keys: Vec<String> = store.keys().map(str::to_owned).collect();

    for key in keys {
        let original = match store.get(&key) {
            Some(value) if contains_placeholder(value) => value.to_owned(),
            _ => continue,
        };

        let mut current = original.clone();
        let mut substituted = 0;
        for referenced in referenced_keys(&original) {
            let Some(value) = store.lookup(referenced, env) else {
                continue;
            };
            if contains_placeholder(&value) {
                continue;
            }
            let literal = token(referenced);
            if current.contains(&literal) {
                current = current.replace(&literal, &value);
                substituted += 1;
            }
        }

        // Anything still pointing at an existing key needs another pass. This
        // also catches tokens formed by joining substituted text.
        let outstanding = referenced_keys(&current)
            .into_iter()
            .any(|referenced| store.lookup(referenced, env).is_some());
        if outstanding {
            outcome.pending.push(key.clone());
        }

        if substituted > 0 {
            debug!(key = %key, substituted, outstanding, "property rewritten");
            store.insert(key, current);
            outcome.rewritten += 1;
            outcome.substitutions += substituted;
        }
    }

    outcome
}

fn unresolved_keys<E>(store: &ConfigurationStore, env: &E) -> BTreeSet<String>
where
    E: EnvironmentFallback + ?Sized,
{
    store
        .iter()
        .flat_map(|(_, value)| referenced_keys(value))
        .filter(|referenced| store.lookup(referenced, env).is_none())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::NoEnv;
    use std::collections::HashMap;

    fn store(pairs: &[(&str, &str)]) -> ConfigurationStore {
        pairs.iter().copied().collect()
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn store_without_tokens_is_untouched() {
        let mut s = store(&[("a", "1"), ("b", "two"), ("c", "$ {not} {a} token")]);
        let before = s.clone();
        let res = resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s, before);
        assert_eq!(res.passes, 1);
        assert_eq!(res.substitutions, 0);
        assert!(res.unresolved.is_empty());
    }

    #[test]
    fn single_reference() {
        let mut s = store(&[("A", "${B}"), ("B", "x")]);
        resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("x"));
        assert_eq!(s.get("B"), Some("x"));
    }

    #[test]
    fn chained_references() {
        let mut s = store(&[("A", "${B}"), ("B", "${C}"), ("C", "z")]);
        let res = resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("z"));
        assert_eq!(s.get("B"), Some("z"));
        assert_eq!(s.get("C"), Some("z"));
        // A is visited before B is rewritten, so one extra pass is needed.
        assert_eq!(res.passes, 2);
    }

    #[test]
    fn absent_reference_stays_literal() {
        let mut s = store(&[("A", "${MISSING}")]);
        let res = resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("${MISSING}"));
        assert_eq!(res.unresolved, BTreeSet::from(["MISSING".to_string()]));
    }

    #[test]
    fn environment_fallback() {
        let mut s = store(&[("A", "${HOME}")]);
        resolve(&mut s, &env(&[("HOME", "/root")])).unwrap();
        assert_eq!(s.get("A"), Some("/root"));
        assert!(!s.contains_key("HOME"));
    }

    #[test]
    fn store_shadows_environment() {
        let mut s = store(&[("A", "${HOME}"), ("HOME", "/srv")]);
        resolve(&mut s, &env(&[("HOME", "/root")])).unwrap();
        assert_eq!(s.get("A"), Some("/srv"));
    }

    #[test]
    fn two_placeholders_in_one_value() {
        let mut s = store(&[("A", "${X}-${Y}"), ("X", "1"), ("Y", "2")]);
        let res = resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("1-2"));
        assert_eq!(res.substitutions, 2);
    }

    #[test]
    fn repeated_placeholder_replaced_everywhere() {
        let mut s = store(&[("A", "${X}/${X}/${X}"), ("X", "ab")]);
        resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("ab/ab/ab"));
    }

    #[test]
    fn mixed_resolved_and_absent() {
        let mut s = store(&[("url", "jdbc:${host}:${port}"), ("host", "db")]);
        let res = resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("url"), Some("jdbc:db:${port}"));
        assert_eq!(res.unresolved, BTreeSet::from(["port".to_string()]));
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let mut once = store(&[
            ("A", "${B}/${MISSING}"),
            ("B", "${C}"),
            ("C", "${HOME}"),
            ("D", "plain"),
        ]);
        let e = env(&[("HOME", "/root")]);
        resolve(&mut once, &e).unwrap();
        let mut twice = once.clone();
        resolve(&mut twice, &e).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.get("A"), Some("/root/${MISSING}"));
    }

    #[test]
    fn cycle_is_reported_not_looped() {
        let mut s = store(&[("A", "${B}"), ("B", "${A}")]);
        let before = s.clone();
        let err = resolve(&mut s, &NoEnv).unwrap_err();
        assert!(matches!(err, InterpolationError::Stalled { .. }));
        assert!(err.passes() <= DEFAULT_MAX_PASSES);
        assert_eq!(err.pending(), ["A", "B"]);
        assert_eq!(s, before);
    }

    #[test]
    fn open_token_before_line_break_does_not_hide_later_token() {
        let mut s = store(&[("A", "${a\n${b}"), ("b", "x")]);
        let resolution = resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("${a\nx"));
        assert!(resolution.unresolved.is_empty());
        assert_eq!(resolution.substitutions, 1);
    }

    #[test]
    fn self_reference_is_reported() {
        let mut s = store(&[("A", "x${A}")]);
        let err = resolve(&mut s, &NoEnv).unwrap_err();
        assert_eq!(err.pending(), ["A"]);
    }

    #[test]
    fn chain_into_absent_key_stalls() {
        let mut s = store(&[("A", "${B}"), ("B", "${MISSING}"), ("C", "${D}"), ("D", "d")]);
        let err = resolve(&mut s, &NoEnv).unwrap_err();
        assert!(matches!(err, InterpolationError::Stalled { .. }));
        assert_eq!(err.pending(), ["A"]);
        // Independent keys are still resolved.
        assert_eq!(s.get("C"), Some("d"));
    }

    #[test]
    fn environment_value_with_token_is_pending() {
        let mut s = store(&[("A", "${E}")]);
        let err = resolve(&mut s, &env(&[("E", "${F}"), ("F", "f")])).unwrap_err();
        assert!(matches!(err, InterpolationError::Stalled { .. }));
    }

    #[test]
    fn long_chain_exceeds_pass_ceiling() {
        // k0 -> k1 -> ... -> k9 = end. Sorted order visits k0 first, so each
        // pass only settles one more link.
        let mut s = ConfigurationStore::new();
        for i in 0..9 {
            s.insert(format!("k{i}"), format!("${{k{}}}", i + 1));
        }
        s.insert("k9", "end");

        let mut capped = s.clone();
        let err = Resolver::new(3).resolve(&mut capped, &NoEnv).unwrap_err();
        assert_eq!(
            err,
            InterpolationError::DidNotConverge {
                passes: 3,
                pending: (0..6).map(|i| format!("k{i}")).collect(),
            }
        );

        let res = Resolver::new(20).resolve(&mut s, &NoEnv).unwrap();
        assert!(s.iter().all(|(_, v)| v == "end"));
        assert_eq!(res.passes, 9);
    }

    #[test]
    fn zero_ceiling_is_raised_to_one() {
        assert_eq!(Resolver::new(0).max_passes(), 1);
        let mut s = store(&[("A", "${B}"), ("B", "x")]);
        Resolver::new(0).resolve(&mut s, &NoEnv).unwrap();
        assert_eq!(s.get("A"), Some("x"));
    }

    #[test]
    fn error_messages_name_pending_keys() {
        let err = InterpolationError::DidNotConverge {
            passes: 128,
            pending: vec!["a".into(), "b".into()],
        };
        assert_eq!(
            err.to_string(),
            "interpolation did not converge after 128 passes; pending: a, b"
        );
    }
}
