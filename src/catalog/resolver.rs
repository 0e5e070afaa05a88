//! Turns command text into an ordered chain of clips.

use super::{ClipCatalog, ClipRef};
use rand::seq::SliceRandom;
use rand::Rng;

/// Maximum number of clips one command may chain together.
pub const MAX_CHAIN: usize = 3;

/// Reasons a command could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Could not find a sound called {0}")]
    UnknownCollection(String),

    #[error("Too many sounds requested. Limit is {max}.")]
    ChainTooLong { max: usize },

    #[error("No sound requested")]
    Empty,
}

/// Resolve a command using the thread-local RNG.
pub fn resolve_command(input: &str, catalog: &ClipCatalog) -> Result<Vec<ClipRef>, ResolveError> {
    resolve(input, catalog, &mut rand::thread_rng())
}

/// Resolve whitespace separated tokens into a clip chain.
///
/// Each run starts with a collection name, followed by zero or more clip
/// names from that collection. A collection with no explicit clip plays a
/// random member. The token that ends a run is rescanned as the next
/// collection.
pub fn resolve<R>(input: &str, catalog: &ClipCatalog, rng: &mut R) -> Result<Vec<ClipRef>, ResolveError>
where
    R: Rng + ?Sized,
{
    let mut tokens = input.split_whitespace().peekable();
    let mut chain: Vec<ClipRef> = Vec::with_capacity(MAX_CHAIN);

    while let Some(token) = tokens.next() {
        let collection = catalog
            .collection(token)
            .ok_or_else(|| ResolveError::UnknownCollection(token.to_string()))?;

        let mut explicit = false;
        while let Some(clip) = tokens.peek().and_then(|next| collection.find(next)) {
            push(&mut chain, clip.clone())?;
            tokens.next();
            explicit = true;
        }

        if !explicit {
            // Collections are never empty once loaded.
            if let Some(clip) = collection.clips().choose(rng) {
                push(&mut chain, clip.clone())?;
            }
        }
    }

    if chain.is_empty() {
        return Err(ResolveError::Empty);
    }

    Ok(chain)
}

fn push(chain: &mut Vec<ClipRef>, clip: ClipRef) -> Result<(), ResolveError> {
    if chain.len() == MAX_CHAIN {
        return Err(ResolveError::ChainTooLong { max: MAX_CHAIN });
    }
    chain.push(clip);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Clip;
    use bytes::Bytes;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn catalog() -> ClipCatalog {
        let clips = [
            ("airhorn", "default"),
            ("airhorn", "reverb"),
            ("khaled", "one"),
            ("khaled", "two"),
            ("khaled", "three"),
            ("cena", "classic"),
        ];
        ClipCatalog::from_clips(
            clips
                .iter()
                .map(|(c, n)| Clip::new(*c, *n, vec![Bytes::from_static(b"f")])),
        )
    }

    fn names(chain: &[ClipRef]) -> Vec<String> {
        chain.iter().map(|c| c.to_string()).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_explicit_clip() {
        let chain = resolve("airhorn reverb", &catalog(), &mut rng()).unwrap();
        assert_eq!(names(&chain), ["airhorn.reverb"]);
    }

    #[test]
    fn test_bare_collection_is_random_member() {
        let chain = resolve("airhorn", &catalog(), &mut rng()).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].collection(), "airhorn");
        assert!(["default", "reverb"].contains(&chain[0].name()));
    }

    #[test]
    fn test_clip_then_collection() {
        let chain = resolve("airhorn default khaled", &catalog(), &mut rng()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].to_string(), "airhorn.default");
        assert_eq!(chain[1].collection(), "khaled");
    }

    #[test]
    fn test_random_then_explicit() {
        let chain = resolve("khaled cena classic", &catalog(), &mut rng()).unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].collection(), "khaled");
        assert_eq!(chain[1].to_string(), "cena.classic");
    }

    #[test]
    fn test_consecutive_clips_of_one_collection() {
        let chain = resolve("khaled one three", &catalog(), &mut rng()).unwrap();
        assert_eq!(names(&chain), ["khaled.one", "khaled.three"]);
    }

    #[test]
    fn test_unknown_token_after_collection() {
        // `cat` is not an airhorn clip, so airhorn plays a random clip and
        // `cat` is then rejected as a collection.
        let err = resolve("airhorn cat", &catalog(), &mut rng()).unwrap_err();
        assert_eq!(err, ResolveError::UnknownCollection("cat".into()));
    }

    #[test]
    fn test_clip_name_without_collection_is_unknown() {
        let err = resolve("reverb", &catalog(), &mut rng()).unwrap_err();
        assert_eq!(err, ResolveError::UnknownCollection("reverb".into()));
    }

    #[test]
    fn test_extra_whitespace_is_skipped() {
        let chain = resolve("  airhorn    reverb  ", &catalog(), &mut rng()).unwrap();
        assert_eq!(names(&chain), ["airhorn.reverb"]);
    }

    #[test]
    fn test_chain_limit() {
        let chain = resolve("airhorn cena khaled", &catalog(), &mut rng()).unwrap();
        assert_eq!(chain.len(), MAX_CHAIN);

        let err = resolve("airhorn cena khaled airhorn", &catalog(), &mut rng()).unwrap_err();
        assert_eq!(err, ResolveError::ChainTooLong { max: MAX_CHAIN });

        let err = resolve("khaled one two three airhorn", &catalog(), &mut rng()).unwrap_err();
        assert_eq!(err, ResolveError::ChainTooLong { max: MAX_CHAIN });
    }

    #[test]
    fn test_empty_command() {
        assert_eq!(resolve("", &catalog(), &mut rng()).unwrap_err(), ResolveError::Empty);
        assert_eq!(resolve("   ", &catalog(), &mut rng()).unwrap_err(), ResolveError::Empty);
    }

    #[test]
    fn test_random_fallback_covers_every_member() {
        let catalog = catalog();
        let mut rng = rng();
        let mut counts: HashMap<String, usize> = HashMap::new();

        const RUNS: usize = 3000;
        for _ in 0..RUNS {
            let chain = resolve("khaled", &catalog, &mut rng).unwrap();
            assert_eq!(chain[0].collection(), "khaled");
            *counts.entry(chain[0].name().to_string()).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        // Expected 1000 each; a uniform pick lands far inside this band.
        for (name, count) in counts {
            assert!((800..1200).contains(&count), "{} picked {} times", name, count);
        }
    }

    proptest! {
        #[test]
        fn prop_bare_collections_stay_in_collection(seed in any::<u64>(), picks in prop::collection::vec(0usize..3, 1..=MAX_CHAIN)) {
            let colls = ["airhorn", "khaled", "cena"];
            let input: Vec<&str> = picks.iter().map(|&i| colls[i]).collect();
            let chain = resolve(&input.join(" "), &catalog(), &mut StdRng::seed_from_u64(seed)).unwrap();

            prop_assert_eq!(chain.len(), input.len());
            for (clip, coll) in chain.iter().zip(&input) {
                prop_assert_eq!(clip.collection(), *coll);
            }
        }

        #[test]
        fn prop_too_many_segments_fail(extra in 1usize..4) {
            let input = vec!["cena"; MAX_CHAIN + extra].join(" ");
            let err = resolve(&input, &catalog(), &mut rng()).unwrap_err();
            prop_assert_eq!(err, ResolveError::ChainTooLong { max: MAX_CHAIN });
        }
    }
}
