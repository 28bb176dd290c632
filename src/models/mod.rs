pub mod show;

pub use show::{
    Episode, MetaPayload, SearchSuggestion, ShowDataset, ShowIdentity, ShowMetadata, ShowPayload,
};
