pub mod length_range;
pub mod norm_query;
pub mod phrase;
pub mod query;
pub mod search_options;

pub use length_range::LengthRange;
pub use norm_query::{NormQuery, NormQueryUnit};
pub use phrase::{Frequency, IndexFrequency, Phrase, PhraseId};
pub use query::{Query, QueryKind};
pub use search_options::SearchOptions;
