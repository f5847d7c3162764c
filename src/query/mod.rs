pub mod dictionaries;
pub mod fuzzy;
pub mod intent;
pub mod phonetic;

pub use fuzzy::{EnhancedQuery, FuzzyEnhancer, MatchKind, TokenCorrection};
pub use intent::{IntentClassification, IntentClassifier, QueryIntent};
pub use phonetic::{DoubleMetaphone, PhoneticAlgorithm, double_metaphone, match_phonetic, metaphone, soundex};
