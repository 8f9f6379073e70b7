use std::sync::Arc;

use clap::Parser;

use slip6::cli::Cli;
use slip6::link::{SimConfig, SimLinkLayer};
use slip6::node::NodeBuilder;
use slip6::Args;

#[tokio::main]
async fn main() {
    env_logger::init();

    let args = Args::parse();

    let sim_config = match SimConfig::parse_from_path(&args.simconfig) {
        Ok(c) => c,
        Err(e) => fail(&e),
    };

    let links = match SimLinkLayer::bind(&sim_config, args.addresses.len(), args.baud).await {
        Ok(l) => Arc::new(l),
        Err(e) => fail(&e),
    };

    let node = match NodeBuilder::new(links, args.router_config()).build() {
        Ok(n) => Arc::new(n),
        Err(e) => fail(&e),
    };

    for route in node.routes().snapshot() {
        log::info!("{}", route);
    }

    if args.no_console {
        node.run().await;
        return;
    }

    let runner = node.clone();
    tokio::spawn(async move {
        runner.run().await;
    });

    Cli::new(node).run().await;
}

fn fail(e: &dyn std::fmt::Display) -> ! {
    eprintln!("Error: {}", e);
    eprintln!("Usage: slip6 [OPTIONS] <IPV6-ADDR>...");
    std::process::exit(1);
}
