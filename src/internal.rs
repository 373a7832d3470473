pub mod trace_trait;
