pub mod purge_expired;
