// ============================================================================
// LAYERED PROJECT MANIFEST
// ============================================================================
//
// A project is a small text file plus one PNG per layer:
//
//     <blank line>
//     sky.png
//     sky
//     ground.png
//     ground
//
// Each pair names an image file and the layer that receives it, in stack
// order.  Image paths are relative to the manifest's directory.
// ============================================================================

use std::path::{Path, PathBuf};

use crate::canvas::{Layer, LayerStack};
use crate::error::{EditorError, EditorResult};
use crate::io::{self, FileType};

/// Suffix appended to the reference name when a full project is saved.
pub const MANIFEST_SUFFIX: &str = "LayeredProject.txt";

/// One (file, layer) pair from a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    pub file: PathBuf,
    pub layer_name: String,
}

/// Split manifest text into entries.  The first line is always discarded.
pub fn parse_manifest(text: &str) -> EditorResult<Vec<ManifestEntry>> {
    let mut lines = text.lines().skip(1).peekable();
    let mut entries = Vec::new();

    while let Some(file) = lines.next() {
        if file.trim().is_empty() && lines.peek().is_none_or(|rest| rest.trim().is_empty()) {
            // trailing blank lines
            continue;
        }
        let layer_name = lines.next().ok_or_else(|| {
            EditorError::invalid(format!("manifest entry '{}' has no layer name", file))
        })?;
        entries.push(ManifestEntry {
            file: PathBuf::from(file.trim()),
            layer_name: layer_name.to_string(),
        });
    }
    Ok(entries)
}

/// Manifest text describing every layer of `stack`.
pub fn manifest_text(stack: &LayerStack) -> String {
    stack.layers().iter().map(Layer::manifest_record).collect()
}

/// Rebuild a full stack from a manifest file.
pub fn load_layered_project(manifest: &Path) -> EditorResult<LayerStack> {
    if !manifest.is_file() {
        return Err(EditorError::not_found(format!("Cannot find file {}", manifest.display())));
    }
    let text = std::fs::read_to_string(manifest)?;
    let base = manifest.parent().unwrap_or(Path::new("."));

    let mut layers = Vec::new();
    for entry in parse_manifest(&text)? {
        let path = base.join(&entry.file);
        if !path.is_file() {
            return Err(EditorError::not_found(format!(
                "Cannot find layer file {}",
                path.display()
            )));
        }
        let image = io::load_image_sync(&path)?;
        layers.push(Layer::with_image(entry.layer_name, image));
    }

    let stack = LayerStack::from_layers(layers)?;
    log::info!("loaded project {} ({} layers)", manifest.display(), stack.len());
    Ok(stack)
}

/// Write `{dir}/{reference}LayeredProject.txt` plus one PNG per layer.
/// Nothing is written unless every layer has an image.
pub fn export_full_project(stack: &LayerStack, dir: &Path, reference: &str) -> EditorResult<PathBuf> {
    if stack.is_empty() {
        return Err(EditorError::EmptyStack);
    }
    if let Some(empty) = stack.layers().iter().find(|l| l.is_empty()) {
        return Err(EditorError::EmptyLayer(empty.name().to_string()));
    }

    for layer in stack.layers() {
        let path = dir.join(format!("{}.png", layer.name()));
        io::encode_and_write(layer.image()?, &path, FileType::Png)?;
    }
    let manifest_path = dir.join(format!("{}{}", reference.trim(), MANIFEST_SUFFIX));
    io::write_bytes(&manifest_path, manifest_text(stack).as_bytes())?;

    log::info!(
        "exported project {} ({} layers)",
        manifest_path.display(),
        stack.len()
    );
    Ok(manifest_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::RasterImage;
    use image::Rgb;

    #[test]
    fn parse_skips_first_line_and_pairs_the_rest() {
        let entries = parse_manifest("\ncat.png\ncat\ndog.png\nbig dog\n").unwrap();
        assert_eq!(
            entries,
            vec![
                ManifestEntry { file: "cat.png".into(), layer_name: "cat".into() },
                ManifestEntry { file: "dog.png".into(), layer_name: "big dog".into() },
            ]
        );
    }

    #[test]
    fn parse_rejects_dangling_file() {
        assert!(matches!(parse_manifest("\ncat.png\ncat\ndog.png"), Err(EditorError::InvalidArgument(_))));
    }

    #[test]
    fn parse_empty_manifest() {
        assert!(parse_manifest("").unwrap().is_empty());
        assert!(parse_manifest("\n\n\n").unwrap().is_empty());
    }

    #[test]
    fn manifest_text_matches_records() {
        let stack = LayerStack::from_layers(vec![Layer::new("a"), Layer::new("b")]).unwrap();
        assert_eq!(manifest_text(&stack), "\na.png\na\nb.png\nb");
        assert_eq!(parse_manifest(&manifest_text(&stack)).unwrap().len(), 2);
    }

    #[test]
    fn export_refuses_empty_layers_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let img = RasterImage::filled(2, 2, 255, Rgb([1, 2, 3])).unwrap();
        let stack =
            LayerStack::from_layers(vec![Layer::with_image("full", img), Layer::new("blank")]).unwrap();
        let err = export_full_project(&stack, dir.path(), "p").unwrap_err();
        assert!(matches!(err, EditorError::EmptyLayer(name) if name == "blank"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        let err = export_full_project(&LayerStack::new(), dir.path(), "p").unwrap_err();
        assert!(matches!(err, EditorError::EmptyStack));
    }

    #[test]
    fn export_then_load_restores_layers() {
        let dir = tempfile::tempdir().unwrap();
        let sky = RasterImage::filled(3, 2, 200, Rgb([10, 20, 200])).unwrap();
        let board = RasterImage::checkerboard(2, 1, Rgb([0, 255, 255]), Rgb([255, 175, 175])).unwrap();
        let stack = LayerStack::from_layers(vec![
            Layer::with_image("sky", sky.clone()),
            Layer::with_image("board", board.clone()),
        ])
        .unwrap();

        let manifest = export_full_project(&stack, dir.path(), "demo").unwrap();
        assert_eq!(manifest.file_name().unwrap(), "demoLayeredProject.txt");

        let mut loaded = load_layered_project(&manifest).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.current_name(), Some("sky"));
        assert_eq!(loaded.current_layer().unwrap().image().unwrap().colors(), sky.colors());
        loaded.set_current("board").unwrap();
        assert_eq!(loaded.color_at(1, 0).unwrap(), board.color_at(1, 0).unwrap());
    }

    #[test]
    fn load_reports_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = load_layered_project(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(missing, EditorError::NotFound(_)));

        let manifest = dir.path().join("xLayeredProject.txt");
        std::fs::write(&manifest, "\nghost.png\nghost").unwrap();
        let err = load_layered_project(&manifest).unwrap_err();
        assert!(matches!(err, EditorError::NotFound(_)));
    }
}
