pub mod price_queries;
