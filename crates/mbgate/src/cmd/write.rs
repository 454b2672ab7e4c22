use mbgate_frame::{function_name, WRITE_MULTIPLE_REGISTERS, WRITE_SINGLE_REGISTER};

use crate::cmd::{connect_client, WriteArgs};
use crate::exit::{gateway_error, CliResult, SUCCESS};
use crate::output::{print_write, OutputFormat, WriteOutput};

pub fn run(args: WriteArgs, format: OutputFormat) -> CliResult<i32> {
    let mut client = connect_client(&args.target, &args.client)?;

    let function = match args.values.as_slice() {
        [value] => {
            client
                .write_single_register(args.start, *value)
                .map_err(|err| gateway_error("write failed", err))?;
            WRITE_SINGLE_REGISTER
        }
        values => {
            client
                .write_multiple_registers(args.start, values)
                .map_err(|err| gateway_error("write failed", err))?;
            WRITE_MULTIPLE_REGISTERS
        }
    };

    print_write(
        &WriteOutput {
            target: &args.target,
            unit_id: args.client.unit,
            function: function_name(function),
            start: args.start,
            count: args.values.len(),
        },
        format,
    );
    Ok(SUCCESS)
}
