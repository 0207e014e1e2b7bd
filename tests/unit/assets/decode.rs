use super::*;

#[test]
fn decode_image_png_dimensions_and_premul() {
    let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
    let img = image::RgbaImage::from_raw(1, 1, src_rgba).unwrap();

    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();

    let prepared = decode_image(&buf).unwrap();
    assert_eq!((prepared.width, prepared.height), (1, 1));
    assert_eq!(
        prepared.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn decode_garbage_fails() {
    assert!(decode_image(b"not an image").is_err());
}

#[test]
fn png_encode_unpremultiplies() {
    let premul = [64u8, 0, 0, 128, 10, 20, 30, 255];
    let png = encode_png_premul(2, 1, &premul).unwrap();
    let back = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(back.get_pixel(0, 0).0, [128, 0, 0, 128]);
    assert_eq!(back.get_pixel(1, 0).0, [10, 20, 30, 255]);
}

#[test]
fn jpeg_encode_produces_jfif() {
    let premul = vec![200u8; 8 * 8 * 4];
    let jpg = encode_jpeg_premul(8, 8, &premul, 80).unwrap();
    assert_eq!(&jpg[..2], &[0xFF, 0xD8]);
    assert!(encode_jpeg_premul(8, 8, &premul[..10], 80).is_err());
}
