pub mod api {
    pub mod models {
        pub mod photo;
        pub mod video;
    }
    pub mod client;
    pub mod error;
}
