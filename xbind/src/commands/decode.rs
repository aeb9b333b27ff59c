use crate::cli::DecodeArgs;
use crate::error::{Error, Result};
use crate::util::{Loaded, read_file, write_output};

pub fn run(args: DecodeArgs) -> Result<()> {
    let loaded = Loaded::open(&args.binding)?;
    let xml = read_file(&args.input)?;

    let type_name = loaded.root_type(&xml, &args.input)?;
    let codec = loaded.root_codec(&type_name)?;
    let value = xbind_format::from_str(&codec, &loaded.registry.context(), &xml).map_err(
        |source| Error::Decode {
            path: args.input.clone(),
            source,
        },
    )?;

    let json = serde_json::to_string_pretty(&value.to_json())
        .map_err(|source| Error::Json { source })?;
    write_output(args.output.as_deref(), &json)
}
