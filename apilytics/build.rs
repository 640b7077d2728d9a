fn main() {
    // Define cfg aliases for better readability, and to reduce repetition.
    cfg_aliases::cfg_aliases! {
        apilytics_any_http_transport: { any(feature = "reqwest", feature = "ureq") },
    }
}
