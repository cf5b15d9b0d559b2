pub mod fallback;
pub mod merge;
pub mod normalize;
pub mod patterns;

pub use fallback::FallbackExtractor;
pub use merge::{precedence_fold, ExtractionMerger};
pub use normalize::{
    canonicalize_activity, is_canonical_activity, normalize_date, resolve_place_collision,
    sanitize_location, NameFilter, CANONICAL_ACTIVITIES, DEFAULT_NAME_EXCLUSIONS,
};
pub use patterns::PatternExtractor;
