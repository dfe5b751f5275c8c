use std::io::Read;
// Import multiform types.
use multiform::{Multipart, MultipartEncoder, StoreOptions};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Build a body with a plain field, a file and a group of attachments.
    let mut encoder = MultipartEncoder::with_random_boundary()?;
    encoder
        .field("title", "Holiday pictures", &[])
        .file("cover", "cover.txt", "text/plain", "a cover image, in spirit".as_bytes(), &[])
        .open_group("photos", "photos-boundary")
        .attachment("beach.txt", "text/plain", "sand".as_bytes(), &[])
        .attachment("hills.txt", "text/plain", "grass".as_bytes(), &[]);
    encoder.close_group()?;

    let content_type = encoder.content_type();
    let mut body = Vec::new();
    encoder.finish().read_to_end(&mut body)?;

    // Get the boundary back from the `Content-Type` header, as a server would.
    let boundary = multiform::parse_boundary(&content_type)?;

    // Create a `Multipart` instance from the body and the boundary.
    let mut multipart = Multipart::new(body.as_slice(), boundary);

    // Read the first part as text, then store the rest.
    if let Some(part) = multipart.next_part()? {
        let name = part.name().to_owned();
        println!("Name: {:?}, Content: {:?}", name, part.text()?);
    }

    for part in multipart.store_all(&StoreOptions::new())? {
        println!(
            "Name: {:?}, File Name: {:?}, Content: {:?}",
            part.name(),
            part.file_name(),
            part.text()?
        );
        part.close()?;
    }

    Ok(())
}
