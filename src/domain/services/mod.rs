pub mod execution_venue;
