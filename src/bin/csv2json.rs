//! Convert the exported price list CSV into `price_list.json`

use std::path::PathBuf;

use clap::Parser;
use sulama_asistani::storage::csv::{convert_price_list, DEFAULT_DELIMITER};

#[derive(Debug, Parser)]
#[command(name = "csv2json", about = "Fiyat listesi CSV dosyasını JSON'a çevirir")]
struct Args {
    /// Source CSV file
    #[arg(short, long, default_value = "data/price_list.csv")]
    input: PathBuf,

    /// Destination JSON file
    #[arg(short, long, default_value = "data/price_list.json")]
    output: PathBuf,

    /// Field delimiter
    #[arg(short, long, default_value_t = DEFAULT_DELIMITER as char)]
    delimiter: char,
}

fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    if !args.delimiter.is_ascii() {
        tracing::error!("Delimiter must be a single ASCII character");
        std::process::exit(2);
    }

    match convert_price_list(&args.input, &args.output, args.delimiter as u8) {
        Ok(count) => println!("price_list.json güncellendi. Toplam satır: {count}"),
        Err(e) => {
            tracing::error!("Failed to convert {}: {e}", args.input.display());
            std::process::exit(1);
        }
    }
}
