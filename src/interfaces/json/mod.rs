pub mod purchase_codec;
