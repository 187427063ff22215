//! Price-gap CLI
//!
//! Usage:
//!   cargo run --bin price_gap -- --nums "5 2 9 7 4" --k 3
//!   printf '5 2 9 7 4\n3\n' | cargo run --bin price_gap

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufRead};

use pricegap_backend::price_gap::{find_price_gap_pair, Gap};

#[derive(Parser, Debug)]
#[command(name = "price_gap")]
#[command(about = "Find the first index pair whose values differ by exactly k")]
struct Args {
    /// Whitespace- or comma-separated integers (read from stdin when omitted)
    #[arg(long, env = "PRICE_GAP_NUMS")]
    nums: Option<String>,

    /// Required absolute difference (read from stdin when omitted)
    #[arg(long, allow_hyphen_values = true)]
    k: Option<i64>,
}

fn parse_nums(line: &str) -> Result<Vec<i64>> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i64>().with_context(|| format!("Invalid integer {s:?}")))
        .collect()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    let nums = match args.nums {
        Some(raw) => parse_nums(&raw)?,
        None => {
            let line = lines.next().context("Expected a line of integers")??;
            parse_nums(&line)?
        }
    };

    let k = match args.k {
        Some(k) => k,
        None => {
            let line = lines.next().context("Expected the gap k")??;
            line.trim()
                .parse::<i64>()
                .with_context(|| format!("Invalid gap {:?}", line.trim()))?
        }
    };

    let gap = Gap::new(k)?;
    match find_price_gap_pair(&nums, gap) {
        Some(pair) => println!("{pair}"),
        None => println!("None"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nums() {
        assert_eq!(parse_nums("5 2, 9\t-7").unwrap(), vec![5, 2, 9, -7]);
        assert!(parse_nums("").unwrap().is_empty());
        assert!(parse_nums("1 x").is_err());
    }
}
