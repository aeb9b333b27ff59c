use crate::cli::RoundtripArgs;
use crate::error::{Error, Result};
use crate::util::{Loaded, read_file, write_output};

pub fn run(args: RoundtripArgs) -> Result<()> {
    let loaded = Loaded::open(&args.binding)?;
    let xml = read_file(&args.input)?;

    let type_name = loaded.root_type(&xml, &args.input)?;
    let codec = loaded.root_codec(&type_name)?;
    let name = loaded.root_element(&type_name)?;
    let cx = loaded.registry.context();

    let value = xbind_format::from_str(&codec, &cx, &xml).map_err(|source| Error::Decode {
        path: args.input.clone(),
        source,
    })?;
    let out = xbind_format::to_string(&codec, &cx, &value, &name, args.indent)
        .map_err(|source| Error::Encode { source })?;

    write_output(args.output.as_deref(), &out)
}
