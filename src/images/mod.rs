mod form;
mod services;

pub use form::MultipartForm;
pub use services::{image_url, release_image, release_images, upload_image, Folder, UploadItem};
