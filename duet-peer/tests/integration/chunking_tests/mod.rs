mod test_chunked_offer_reassembled;
mod test_reversed_chunks;
