#[tokio::main]
async fn main() {
    let _guard = hollow_presence_lib::logging::init_logging();
    hollow_presence_lib::run().await;
}
