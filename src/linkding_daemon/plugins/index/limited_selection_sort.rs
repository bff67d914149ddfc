/// Moves the `limit` biggest elements, in descending order, to the front.
/// The rest of the slice is left unordered.
pub fn sort<T: PartialOrd>(arr: &mut [T], limit: usize) {
    for i in 0..limit.min(arr.len()) {
        let max_idx = get_max_idx(arr, i);
        arr.swap(i, max_idx);
    }
}

fn get_max_idx<T: PartialOrd>(arr: &[T], from: usize) -> usize {
    let mut max_idx = from;
    for i in (from + 1)..arr.len() {
        if arr[max_idx] < arr[i] {
            max_idx = i
        }
    }
    max_idx
}
