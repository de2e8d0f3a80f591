mod config;
mod crawler;
mod dedup;
mod error;
mod extract;
mod netlog;
mod scroll;
mod session;
mod storage;

use std::time::Instant;

use dotenv::dotenv;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::Config::from_env()?;
    println!(
        "🗺️ Map crawler starting: {} cities × {} districts × {} categories → {}",
        config.cities.len(),
        config.districts.len(),
        config.categories.len(),
        config.data_dir.display()
    );

    let started = Instant::now();
    let crawler = crawler::MapCrawler::new(config);
    crawler.run_all().await;

    println!("🏁 Run finished in {:.3}s", started.elapsed().as_secs_f64());
    Ok(())
}
