pub mod http_fetcher;
