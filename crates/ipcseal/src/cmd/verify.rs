use std::io::Read;

use ipcseal_channel::unpackage;
use tracing::debug;

use crate::cmd::{read_file, VerifyArgs};
use crate::exit::{channel_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_message, OutputFormat, Received};

pub fn run(args: VerifyArgs, format: OutputFormat) -> CliResult<i32> {
    let security = args.secret.required_context()?;

    let input = match &args.file {
        Some(path) => read_file(path)?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .map_err(|err| io_error("failed reading stdin", err))?;
            buf
        }
    };
    let envelope = input.trim_ascii();
    if envelope.is_empty() {
        return Err(CliError::new(DATA_INVALID, "no envelope on input"));
    }
    debug!(len = envelope.len(), "verifying envelope");

    let (meta, message) =
        unpackage(&security, envelope).map_err(|err| channel_error("verify failed", err))?;
    print_message(
        &Received {
            channel: None,
            receiver: None,
            meta: &meta,
            message: &message,
        },
        format,
    );
    Ok(SUCCESS)
}
