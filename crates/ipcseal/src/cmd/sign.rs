use ipcseal_channel::Envelope;

use crate::cmd::{read_file, SignArgs};
use crate::exit::{channel_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_envelope, OutputFormat};

pub fn run(args: SignArgs, format: OutputFormat) -> CliResult<i32> {
    let security = args.secret.required_context()?;
    let message = resolve_payload(&args)?;

    let envelope = Envelope::seal(&security, &args.client_id, &message)
        .map_err(|err| channel_error("sign failed", err))?;
    print_envelope(&envelope, format);
    Ok(SUCCESS)
}

fn resolve_payload(args: &SignArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    match &args.file {
        Some(path) => read_file(path),
        None => Err(CliError::new(USAGE, "one of --data or --file is required")),
    }
}
