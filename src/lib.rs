/*!
# Interactive Data Table

The data-processing core of a browser-based interactive data table, built in Rust.

## Overview

The table loads a list of link-listing records (from a bundled CSV file or a
spreadsheet API response) and lets a user filter, sort, select, copy and export
rows. Only the slice of rows intersecting the viewport is ever materialized, so
the list can grow without bound while scrolling stays cheap.

## Architecture

Every user input reruns the same synchronous pipeline:

```text
RecordSource → RecordSet → filter (free text AND column conditions)
             → sort (one column, stable) → view of RecordIds
             → virtualizer (visible window) → selection / export
```

### Core Components
- **Record Source Adapter** - Parses CSV or `{values: [[...]]}` payloads against a fixed schema, with a cache and force refresh
- **Predicate Evaluator** - Typed `contains`/`equals`/`greater`/`less` tests, fail-closed on non-numeric input
- **Filter Engine** - Free-text search over all columns ANDed with per-column conditions, order preserving
- **Sort Engine** - Stable lexicographic sort on a single column
- **Windowed Render Planner** - Visible index range, row offsets and total extent for a scroll position
- **Selection & Export Tracker** - Identity-keyed selection and CSV serialization

### Persistence Layer
- A key/value persistence port (`Storage`) holding the login flag, cached payloads and filter conditions
- File-backed implementation with Gzip compression and bincode serialization

## Modules

- **record**: Schema, records and the immutable working set
- **predicate**: Filter conditions and their evaluation
- **filter**: Condition sets and the two-layer filter
- **sort**: Sort state and the stable sort
- **virtualizer**: Viewport metrics and window planning
- **selection**: Row selection keyed by record identity
- **export**: CSV serialization and delivery sinks
- **debounce**: Trailing-edge debouncer and clock
- **source**: Payload parsing, sources, cached loading, request tokens
- **storage**: Persistence port and implementations
- **config**: Table configuration
- **table**: The table component tying everything together
- **app**: HTTP front end (feature `web`)
- **wasm**: Browser bindings (feature `wasm`)
*/

pub mod config;
pub mod debounce;
pub mod error;
pub mod export;
pub mod filter;
pub mod predicate;
pub mod record;
pub mod selection;
pub mod sort;
pub mod source;
pub mod storage;
pub mod table;
pub mod virtualizer;

#[cfg(feature = "web")]
pub mod app;

#[cfg(feature = "wasm")]
pub mod wasm;

/// Re-export the commonly used types to make them easier to reach
pub use config::TableConfig;
pub use error::{ConfigError, ExportError, LoadError, StorageError, TableError};
pub use filter::{ConditionSet, filter, filter_ids};
pub use predicate::{FilterCondition, FilterOperator, evaluate};
pub use record::{Column, Record, RecordId, RecordSet, Schema, ValueKind};
pub use selection::Selection;
pub use sort::{SortDirection, SortState, sort, sort_ids};
pub use source::{Loader, Payload, RecordSource, parse_payload};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use table::{DataTable, ReloadOutcome};
pub use virtualizer::{ViewportMetrics, VirtualItem, Virtualizer, WindowPlan, plan_window};
