pub mod accumulator;
pub mod archive;
pub mod date_range;
pub mod enumeration;
pub mod error;
pub mod export;
pub mod filter;
pub mod joiner;
pub mod models;
pub mod partition;
pub mod schema;

pub use accumulator::{fetch_cmg, fetch_ivt, SeriesResult, SeriesRows};
pub use archive::{inventory, ArchiveEntry};
pub use date_range::{parse_year_month, DateRange, MonthRange};
pub use enumeration::{
    clientes_for_barra, list_barras, list_clientes, DistinctPairs, DistinctValues,
};
pub use error::QueryError;
pub use export::{export_frame, write_report, ExportPaths, QueryReport};
pub use filter::EntityPattern;
pub use joiner::{
    combined_extract, join_price_consumption, label_price_column, CombinedResult, JoinKeys,
    JoinOutcome, JoinSide, PriceRole,
};
pub use models::{
    BarClientsLookup, BarraLookup, ClienteBarra, ClienteLookup, CmgQuery, CombinedQuery,
    DatasetKind, IvtQuery, SkipReason, SkippedPartition, YearMonth,
};
pub use partition::{load_partition, partition_dir, partition_file_name, partition_path, LoadOutcome};
