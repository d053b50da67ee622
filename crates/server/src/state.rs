pub struct AppState {
    pub client: reqwest::Client,
    pub upstream: String,
}
