use camserve::configuration::config::{CliArgs, Config};
use camserve::controller::controller_handler::Controller;
use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
 ██████╗ █████╗ ███╗   ███╗███████╗███████╗██████╗ ██╗   ██╗███████╗
██╔════╝██╔══██╗████╗ ████║██╔════╝██╔════╝██╔══██╗██║   ██║██╔════╝
██║     ███████║██╔████╔██║███████╗█████╗  ██████╔╝██║   ██║█████╗
██║     ██╔══██║██║╚██╔╝██║╚════██║██╔══╝  ██╔══██╗╚██╗ ██╔╝██╔══╝
╚██████╗██║  ██║██║ ╚═╝ ██║███████║███████╗██║  ██║ ╚████╔╝ ███████╗
 ╚═════╝╚═╝  ╚═╝╚═╝     ╚═╝╚══════╝╚══════╝╚═╝  ╚═╝  ╚═══╝  ╚══════╝
====================================================================
        Live MJPEG camera server with snapshot storage v{}
====================================================================
",
        env!("CARGO_PKG_VERSION")
    );

    let args = CliArgs::parse();

    info!("Importing configuration");
    let config = match Config::load(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration: {}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration imported successfully");

    let controller = match Controller::new(config) {
        Ok(controller) => controller,
        Err(e) => {
            error!("Unable to create a controller instance: {}, exiting...", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = controller.run().await {
        error!("Error occured in the controller process: {}, exiting...", e);
        std::process::exit(1);
    }
}
