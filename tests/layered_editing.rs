use image::Rgb;
use rand::SeedableRng;
use rand::rngs::StdRng;

use rasterfe::io::{self, decode_ppm, encode_ppm};
use rasterfe::project;
use rasterfe::{
    EditorError, FileType, FilterKind, Layer, LayerStack, RasterImage, ScriptSession, TransformKind,
};

fn gray(v: u16) -> Rgb<u16> {
    Rgb([v, v, v])
}

fn stack_with(name: &str, image: RasterImage) -> LayerStack {
    let mut stack = LayerStack::new();
    stack.new_layer(name).unwrap();
    stack.load_to_current(image).unwrap();
    stack
}

#[test]
fn blur_darkens_edges_but_keeps_the_center() {
    let mut stack = stack_with("flat", RasterImage::filled(3, 3, 255, gray(200)).unwrap());
    stack.apply_filter(FilterKind::Blur).unwrap();
    assert_eq!(stack.color_at(0, 0).unwrap(), gray(113));
    assert_eq!(stack.color_at(1, 1).unwrap(), gray(200));
}

#[test]
fn uniform_interior_survives_both_kernels() {
    for kind in FilterKind::all() {
        let mut img = RasterImage::filled(7, 7, 255, Rgb([40, 90, 250])).unwrap();
        img.apply_filter(*kind);
        assert_eq!(img.color_at(3, 3).unwrap(), Rgb([40, 90, 250]), "{}", kind);
    }
}

#[test]
fn monochrome_output_is_gray() {
    let colors = vec![Rgb([255, 0, 0]), Rgb([3, 200, 90]), Rgb([17, 17, 240]), Rgb([0, 0, 0])];
    let mut img = RasterImage::new(2, 2, 255, colors).unwrap();
    img.apply_transformation(TransformKind::Monochrome);
    for p in img.pixels() {
        assert_eq!(p.red(), p.green());
        assert_eq!(p.green(), p.blue());
    }
}

#[test]
fn downscale_to_same_size_is_identity() {
    let board = RasterImage::checkerboard(5, 3, Rgb([0, 255, 255]), Rgb([255, 175, 175])).unwrap();
    let mut copy = board.clone();
    copy.apply_downscale(board.width(), board.height()).unwrap();
    assert_eq!(copy, board);
}

#[test]
fn single_seed_mosaic_averages_everything() {
    let colors = vec![Rgb([10, 0, 3]), Rgb([11, 4, 3]), Rgb([0, 9, 3]), Rgb([2, 2, 4])];
    let mut img = RasterImage::new(2, 2, 255, colors).unwrap();
    img.apply_mosaic(1, &mut StdRng::seed_from_u64(3)).unwrap();
    // 23/4, 15/4, 13/4 truncated
    assert!(img.pixels().iter().all(|p| p.color() == Rgb([5, 3, 3])));
}

#[test]
fn mosaic_seed_count_bounds() {
    let mut img = RasterImage::filled(2, 2, 255, gray(1)).unwrap();
    let mut rng = StdRng::seed_from_u64(0);
    assert!(matches!(img.apply_mosaic(0, &mut rng), Err(EditorError::InvalidArgument(_))));
    assert!(matches!(img.apply_mosaic(5, &mut rng), Err(EditorError::InvalidArgument(_))));
    img.apply_mosaic(4, &mut rng).unwrap();
}

#[test]
fn hiding_the_top_layer_moves_current_down() {
    let mut stack = LayerStack::new();
    for name in ["a", "b", "c"] {
        stack.new_layer(name).unwrap();
        stack.set_current(name).unwrap();
        stack.load_to_current(RasterImage::filled(1, 1, 1, gray(1)).unwrap()).unwrap();
    }
    stack.set_invisible().unwrap();
    assert_eq!(stack.current_index(), Some(1));
}

#[test]
fn ppm_round_trip_keeps_everything() {
    let img = RasterImage::new(2, 1, 1023, vec![Rgb([1023, 0, 512]), Rgb([7, 8, 9])]).unwrap();
    let back = decode_ppm(&encode_ppm(&img)).unwrap();
    assert_eq!(back.width(), 2);
    assert_eq!(back.height(), 1);
    assert_eq!(back.max_value(), 1023);
    assert_eq!(back.colors(), img.colors());
}

#[test]
fn second_sky_is_rejected() {
    let mut stack = LayerStack::new();
    stack.new_layer("sky").unwrap();
    assert!(matches!(stack.new_layer("sky"), Err(EditorError::DuplicateName(_))));
}

#[test]
fn project_survives_a_disk_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let stack = LayerStack::from_layers(vec![
        Layer::with_image("base", RasterImage::filled(4, 4, 255, Rgb([9, 99, 199])).unwrap()),
        Layer::with_image(
            "board",
            RasterImage::checkerboard(2, 2, Rgb([0, 0, 0]), Rgb([255, 255, 255])).unwrap(),
        ),
    ])
    .unwrap();
    let manifest = project::export_full_project(&stack, dir.path(), "trip").unwrap();
    let loaded = project::load_layered_project(&manifest).unwrap();

    let names: Vec<_> = loaded.layers().iter().map(Layer::name).collect();
    assert_eq!(names, vec!["base", "board"]);
    for (orig, back) in stack.layers().iter().zip(loaded.layers()) {
        assert_eq!(orig.image().unwrap().colors(), back.image().unwrap().colors());
    }
}

#[test]
fn script_file_drives_the_editor() {
    let dir = tempfile::tempdir().unwrap();
    let board = RasterImage::checkerboard(4, 2, Rgb([0, 0, 0]), Rgb([200, 200, 200])).unwrap();
    io::encode_and_write(&board, &dir.path().join("board.ppm"), FileType::Ppm).unwrap();

    let script = "\
create layer board
load board.ppm
filter sharpen
transformation sepia
adjustment downscale 4&4
adjustment mosaic 3
save small.png
invisible
visible
";
    let mut session = ScriptSession::new(dir.path(), Some(11));
    let mut sink = Vec::new();
    let report = session.run(script.as_bytes(), &mut sink).unwrap();

    // Only one layer: `invisible` leaves it current, `visible` restores it.
    assert!(report.is_success(), "{:?}", report.errors);
    assert!(!report.exited);
    let saved = io::load_image_sync(&dir.path().join("small.png")).unwrap();
    assert_eq!((saved.width(), saved.height()), (4, 4));
    assert!(session.stack().current_layer().unwrap().is_visible());
}
