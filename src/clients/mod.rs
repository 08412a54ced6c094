pub mod app_client;
