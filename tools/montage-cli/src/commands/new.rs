//! Create a container clip document.

use std::path::PathBuf;

use montage_project_model::{ContainerData, ContainerType};

fn parse_type(name: &str) -> anyhow::Result<ContainerType> {
    match name {
        "generator" => Ok(ContainerType::ScriptGenerator),
        "filter" => Ok(ContainerType::FilterScript),
        "xml" => Ok(ContainerType::ProjectXml),
        other => ContainerType::ALL
            .into_iter()
            .find(|t| t.as_str() == other)
            .ok_or_else(|| {
                anyhow::anyhow!("Unknown container type: {other}. Use: generator, filter, xml")
            }),
    }
}

pub fn run(
    clip: PathBuf,
    container_type: String,
    program: PathBuf,
    media: PathBuf,
    length: Option<u64>,
) -> anyhow::Result<()> {
    let container_type = parse_type(&container_type)?;
    let mut data = ContainerData::new(container_type, program, media);
    data.unrendered_length = length;

    data.save(&clip)
        .map_err(|e| anyhow::anyhow!("Failed to save clip: {e}"))?;

    println!("Created {} clip: {}", container_type, clip.display());
    println!("  Program id: {}", data.program_id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_type_accepts_aliases_and_tags() {
        assert_eq!(parse_type("generator").unwrap(), ContainerType::ScriptGenerator);
        assert_eq!(
            parse_type(ContainerType::ProjectXml.as_str()).unwrap(),
            ContainerType::ProjectXml
        );
        assert!(parse_type("blender").is_err());
    }
}
