use datatable::TableConfig;
use datatable::app;
use std::env;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Optional config file, then optional data file overriding it
    let args: Vec<String> = env::args().collect();
    let config_path = args.get(1).map(PathBuf::from);

    let mut config = TableConfig::load(config_path.as_deref())?;
    if let Some(source) = args.get(2) {
        config.source = Some(PathBuf::from(source));
    }

    println!(
        "Starting web server for {}",
        config
            .source
            .as_deref()
            .unwrap_or_else(|| std::path::Path::new("public/data.csv"))
            .display()
    );
    app::run(config).await
}
