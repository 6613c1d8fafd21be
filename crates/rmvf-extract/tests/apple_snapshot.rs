use rmvf_extract::parse_listing_page;

const PAGE_URL: &str = "https://www.apple.com/shop/refurbished/mac";

fn fixture_html() -> String {
    let root = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
    std::fs::read_to_string(root.join("fixtures/apple/sample.html")).expect("fixture html")
}

#[test]
fn every_product_tile_becomes_a_listing() {
    let listings = parse_listing_page(&fixture_html(), PAGE_URL).expect("parse listing page");

    assert_eq!(listings.len(), 4);

    let pro = &listings[0];
    assert!(pro.name.starts_with("Refurbished 16-inch MacBook Pro"));
    assert_eq!(pro.price_text, "$2,799.00");
    assert_eq!(pro.price, 2799.0);
    let pro_url = pro.url.as_deref().expect("tile href");
    assert!(pro_url.starts_with("https://www.apple.com/shop/product/FK1A3LL/"));

    assert_eq!(listings[1].price, 849.0);
    assert_eq!(listings[2].price, 589.0);
    assert_eq!(listings[3].price, 1259.0);
}

#[test]
fn attributes_are_inferred_from_tile_names() {
    let listings = parse_listing_page(&fixture_html(), PAGE_URL).expect("parse listing page");

    let pro = &listings[0];
    assert_eq!(pro.product_family, "MacBook Pro");
    assert_eq!(pro.processor, "Apple M1 Max");
    assert_eq!((pro.cpu_cores, pro.gpu_cores), (10, 32));
    assert_eq!(pro.size_inches, Some(16.0));

    let air = &listings[1];
    assert_eq!(air.product_family, "MacBook Air");
    assert_eq!(air.processor, "Apple M1");
    assert_eq!((air.cpu_cores, air.gpu_cores), (8, 7));
    assert_eq!(air.size_inches, Some(13.3));

    let mini = &listings[2];
    assert_eq!(mini.product_family, "Mac mini");
    assert_eq!(mini.processor, "Apple M1");
    assert_eq!((mini.cpu_cores, mini.gpu_cores), (8, 8));
    assert_eq!(mini.size_inches, None);

    // The Intel iMac tile never names an Apple chip, so its inferred
    // attributes settle on the unknown defaults.
    let imac = &listings[3];
    assert_eq!(imac.product_family, "Unknown");
    assert_eq!(imac.processor, "Unknown");
    assert_eq!((imac.cpu_cores, imac.gpu_cores), (0, 0));
    assert_eq!(imac.size_inches, Some(27.0));
}
