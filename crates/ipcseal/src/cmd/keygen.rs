use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::RngCore;
use serde::Serialize;

use crate::cmd::KeygenArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct KeygenOutput {
    bytes: u16,
    secret: String,
}

pub fn run(args: KeygenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut secret = vec![0u8; usize::from(args.bytes)];
    rand::thread_rng().fill_bytes(&mut secret);
    let encoded = STANDARD.encode(&secret);

    match format {
        OutputFormat::Json => {
            let out = KeygenOutput {
                bytes: args.bytes,
                secret: encoded,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty | OutputFormat::Raw => println!("{encoded}"),
    }
    Ok(SUCCESS)
}
