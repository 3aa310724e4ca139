pub mod page_cache_evictor;
pub mod tmdb;
