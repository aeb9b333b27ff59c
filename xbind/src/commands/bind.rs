use xbind_format::{Binder, Document};

use crate::cli::BindArgs;
use crate::error::{Error, Result};
use crate::util::{Loaded, elements, read_file, write_output};

pub fn run(args: BindArgs) -> Result<()> {
    let loaded = Loaded::open(&args.binding)?;
    let source_xml = read_file(&args.source)?;
    let target_xml = read_file(&args.target)?;

    let type_name = loaded.root_type(&source_xml, &args.source)?;
    let codec = loaded.root_codec(&type_name)?;
    let name = loaded.root_element(&type_name)?;

    let value = xbind_format::from_str(&codec, &loaded.registry.context(), &source_xml).map_err(
        |source| Error::Decode {
            path: args.source.clone(),
            source,
        },
    )?;

    let mut doc = Document::parse(&target_xml).map_err(|source| Error::Decode {
        path: args.target.clone(),
        source,
    })?;
    let root = doc
        .document_element()
        .ok_or_else(|| Error::EmptyDocument {
            path: args.target.clone(),
        })?;
    let before = elements(&doc, root);

    let mut binder = Binder::new(loaded.registry.context(), &mut doc);
    let bound = binder
        .update(&codec, root, &value, &name)
        .map_err(|source| Error::Bind {
            path: args.target.clone(),
            source,
        })?;
    let replaced = binder.invalidated().len();

    let after = bound
        .map(|node| elements(&doc, node))
        .unwrap_or_default();
    let reused = after.intersection(&before).count();
    let added = after.len() - reused;
    tracing::debug!(?bound, reused, added, replaced, "bound document");

    let output = args.output.as_deref().unwrap_or(args.target.as_path());
    write_output(Some(output), &doc.to_xml())?;

    println!(
        "{} element(s) reused, {} added, {} replaced",
        reused, added, replaced
    );
    Ok(())
}
