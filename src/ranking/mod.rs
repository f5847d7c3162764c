pub mod factors;
pub mod models;
pub mod ranker;

pub use models::{
    PopularityProvider, QueryContext, RankingFactors, RankingWeights, ResourceRecord,
    ScoredResult, UserProfile, UserProfileProvider,
};
pub use ranker::{ResultRanker, dedup_key};
