use crate::cmd::{connect_client, ReadArgs};
use crate::exit::{gateway_error, CliResult, SUCCESS};
use crate::output::{print_registers, OutputFormat, RegistersOutput};

pub fn run(args: ReadArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = connect_client(&args.target, &args.client)?;

    // Limits are left to the gateway so its exception reply reaches the user.
    let values = client
        .read_holding_registers(args.start, args.count)
        .map_err(|err| gateway_error("read failed", err))?;

    print_registers(
        &RegistersOutput {
            target: &args.target,
            unit_id: args.client.unit,
            start: args.start,
            count: values.len(),
            values: &values,
        },
        format,
    );
    Ok(SUCCESS)
}
