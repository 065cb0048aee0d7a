use std::path::Path;

use anyhow::{Context, Result};
use hltree::path::parent_of;
use hltree::{Compression, Config, Fetcher, Node, NodeKind, NodeList, Reader, SidecarInfo, Writer};

fn describe(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Attribute => "an attribute",
        NodeKind::Dataset => "a dataset",
        NodeKind::NamedType => "a type",
        NodeKind::Group => "a group",
        NodeKind::Reference => "a reference",
    }
}

/// One line per node: padded name, then its kind.
pub fn list(file: &Path, config: &Config) -> Result<Vec<String>> {
    let list = Reader::new(config.clone())
        .read(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    Ok(list
        .iter()
        .map(|n| format!("{:<40} is {}", n.name(), describe(n.kind())))
        .collect())
}

/// Groups that must exist before `name` can be added.
fn ancestors(name: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut parent = parent_of(name);
    while !parent.is_empty() {
        found.push(parent);
        parent = parent_of(parent);
    }
    found.reverse();
    found
}

pub fn encode(prefix: &Path, output: &Path, level: u32, config: Config) -> Result<()> {
    let (info, data) = SidecarInfo::read(prefix)
        .with_context(|| format!("failed to read sidecar {}", prefix.display()))?;
    let node = info
        .to_node(&data)
        .with_context(|| format!("failed to build {}", info.field_name))?;

    let mut list = NodeList::with_filename(output);
    for group in ancestors(&info.field_name) {
        list.add_node(Node::group(group))?;
    }
    list.add_node(node)
        .with_context(|| format!("failed to add {}", info.field_name))?;

    Writer::new(config.with_compression(Compression::Zlib { level }))
        .write(&mut list)
        .with_context(|| format!("failed to write {}", output.display()))?;
    tracing::debug!(field = %info.field_name, file = %output.display(), "encoded");
    Ok(())
}

pub fn decode(input: &Path, field: &str, prefix: &Path, config: Config) -> Result<()> {
    let mut list = Reader::new(config.clone())
        .read(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let node = Fetcher::new(config)
        .fetch_node(&mut list, field)
        .with_context(|| format!("failed to fetch {field}"))?;
    let info = SidecarInfo::from_node(node)
        .with_context(|| format!("{field} is not a dataset or attribute"))?;
    info.write(prefix, node.data())
        .with_context(|| format!("failed to write sidecar {}", prefix.display()))?;
    tracing::debug!(field, prefix = %prefix.display(), "decoded");
    Ok(())
}
