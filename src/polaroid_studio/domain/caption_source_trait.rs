use std::future::Future;

use crate::domain::caption_request::CaptionRequest;
use crate::infrastructure::error::InfrastructureError;

// クライアント側: キャプションの断片を受け取るたびに on_text を呼ぶ
pub trait CaptionSource {
    fn stream_caption<F>(
        &self,
        request: &CaptionRequest,
        on_text: F,
    ) -> impl Future<Output = Result<(), InfrastructureError>>
    where
        F: FnMut(&str);
}
