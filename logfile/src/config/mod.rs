// This module handles sink configuration: parsing, validation and storage.

mod de; // Serde helpers for the raw structs
pub mod processed; // Validated, compiled sink configuration
pub mod raw; // Structs directly mapping to YAML/JSON structure
pub mod store; // The per-name option store sinks configure through
