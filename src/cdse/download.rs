use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::info;

use super::CdseError;
use super::query::ProductEntry;

/// Bound on manual redirect hops when resolving the download location.
const MAX_REDIRECTS: usize = 8;

/// OData download endpoint for a product id.
fn product_download_url(product_id: &str) -> String {
    format!(
        "https://catalogue.dataspace.copernicus.eu/odata/v1/Products({})/$value",
        product_id
    )
}

/// Download one product archive to `dest`, streaming through a progress bar.
///
/// The `$value` endpoint answers with a redirect chain towards a download
/// host. The hops are followed by hand with the bearer token re-applied on
/// each request; an automatic cross-origin redirect would drop the
/// Authorization header the download host still requires.
pub fn download_product(
    client: &reqwest::blocking::Client,
    token: &str,
    product: &ProductEntry,
    dest: &Path,
) -> Result<(), CdseError> {
    download_from_url(
        client,
        token,
        &product_download_url(&product.id),
        &product.name,
        dest,
    )
}

fn download_from_url(
    client: &reqwest::blocking::Client,
    token: &str,
    start_url: &str,
    name: &str,
    dest: &Path,
) -> Result<(), CdseError> {
    let mut url = start_url.to_string();
    let mut response = client.get(&url).bearer_auth(token).send()?;

    let mut hops = 0;
    while response.status().is_redirection() {
        hops += 1;
        if hops > MAX_REDIRECTS {
            return Err(CdseError::Download {
                product: name.to_string(),
                reason: format!("more than {} redirects", MAX_REDIRECTS),
            });
        }
        url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| CdseError::Download {
                product: name.to_string(),
                reason: "redirect without a Location header".to_string(),
            })?
            .to_string();
        response = client.get(&url).bearer_auth(token).send()?;
    }

    let status = response.status();
    if !status.is_success() {
        return Err(CdseError::Download {
            product: name.to_string(),
            reason: format!(
                "status {}: {}",
                status.as_u16(),
                response.text().unwrap_or_default()
            ),
        });
    }

    let total_bytes = response.content_length().unwrap_or(0);
    let progress = if total_bytes > 0 {
        ProgressBar::new(total_bytes)
    } else {
        ProgressBar::new_spinner()
    };
    if let Ok(style) = ProgressStyle::with_template(
        "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
    ) {
        progress.set_style(style.progress_chars("=>-"));
    }
    progress.set_message(name.to_string());

    let mut reader = progress.wrap_read(response);
    let mut file = File::create(dest)?;
    let copied = io::copy(&mut reader, &mut file);
    progress.finish_and_clear();
    drop(file);

    // A failed transfer must not leave a file that skip-if-exists would
    // accept on the next run.
    match copied {
        Ok(written) if total_bytes == 0 || written == total_bytes => {
            info!("Download completed: {:?} ({} bytes)", dest, written);
            Ok(())
        }
        Ok(written) => {
            let _ = std::fs::remove_file(dest);
            Err(CdseError::Download {
                product: name.to_string(),
                reason: format!("incomplete download: {} of {} bytes", written, total_bytes),
            })
        }
        Err(e) => {
            let _ = std::fs::remove_file(dest);
            Err(CdseError::Download {
                product: name.to_string(),
                reason: format!("transfer failed: {}", e),
            })
        }
    }
}
