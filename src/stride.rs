//! Sample-based stride arithmetic of nD images.
//!
//! Everything here is pure bookkeeping on sizes and signed strides, counted in samples. The image
//! keeps its sizes and strides in separate vectors and hands them to these helpers.

/// Strides of a freshly allocated image: the tensor is interleaved with stride 1 and dimension 0
/// varies fastest.
pub(crate) fn normal_strides(sizes: &[usize], tensor_elements: usize) -> Vec<isize> {
    let mut stride = tensor_elements as isize;
    sizes
        .iter()
        .map(|&size| {
            let current = stride;
            stride *= size as isize;
            current
        })
        .collect()
}

/// Lowest and highest sample offset, relative to the origin, that a layout touches.
pub(crate) fn footprint(
    sizes: &[usize],
    strides: &[isize],
    tensor_elements: usize,
    tensor_stride: isize,
) -> (isize, isize) {
    let extents = sizes
        .iter()
        .zip(strides)
        .map(|(&size, &stride)| (size, stride))
        .chain(core::iter::once((tensor_elements, tensor_stride)));

    let (mut low, mut high) = (0, 0);
    for (size, stride) in extents {
        let reach = (size as isize - 1) * stride;
        if reach < 0 {
            low += reach;
        } else {
            high += reach;
        }
    }
    (low, high)
}

/// Whether no two samples of the layout share an address, tensor included.
///
/// Zero strides of non-singleton dimensions, the broadcast convention, are never valid for
/// allocation.
pub(crate) fn is_non_overlapping(
    sizes: &[usize],
    strides: &[isize],
    tensor_elements: usize,
    tensor_stride: isize,
) -> bool {
    let mut extents: Vec<(usize, usize)> = sizes
        .iter()
        .zip(strides)
        .map(|(&size, &stride)| (stride.unsigned_abs(), size))
        .chain(core::iter::once((tensor_stride.unsigned_abs(), tensor_elements)))
        .filter(|&(_, size)| size > 1)
        .collect();
    extents.sort_unstable();

    let mut reach = 0;
    for (stride, size) in extents {
        if stride <= reach {
            return false;
        }
        reach += stride * (size - 1);
    }
    true
}

/// The single stride with which all pixels can be visited, and the offset of the pixel with the
/// lowest address, if such a stride exists.
///
/// The tensor is not considered.
pub(crate) fn simple_stride(sizes: &[usize], strides: &[isize]) -> Option<(isize, isize)> {
    let mut dims: Vec<(usize, usize)> = sizes
        .iter()
        .zip(strides)
        .filter(|&(&size, _)| size > 1)
        .map(|(&size, &stride)| (stride.unsigned_abs(), size))
        .collect();
    dims.sort_unstable();

    let Some(&(first, _)) = dims.first() else {
        return Some((1, 0));
    };
    if first == 0 {
        return None;
    }

    let mut expected = first;
    for (stride, size) in dims {
        if stride != expected {
            return None;
        }
        expected = stride * size;
    }

    let (offset, _) = footprint(sizes, strides, 1, 0);
    Some((first as isize, offset))
}

/// Dimensions with more than one pixel, ordered by increasing absolute stride.
pub(crate) fn stride_order(sizes: &[usize], strides: &[isize]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..sizes.len()).filter(|&dim| sizes[dim] > 1).collect();
    order.sort_by_key(|&dim| strides[dim].unsigned_abs());
    order
}

/// Whether walking two layouts of equal sizes in memory order visits the same coordinates.
pub(crate) fn same_dimension_order(
    sizes: &[usize],
    strides: &[isize],
    other_strides: &[isize],
) -> bool {
    let order = stride_order(sizes, strides);
    order == stride_order(sizes, other_strides)
        && order
            .iter()
            .all(|&dim| strides[dim].signum() == other_strides[dim].signum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_layout() {
        assert_eq!(normal_strides(&[5, 10, 15], 3), [3, 15, 150]);
        assert_eq!(normal_strides(&[], 1), Vec::<isize>::new());
        assert_eq!(footprint(&[5, 10, 15], &[3, 15, 150], 3, 1), (0, 2249));
    }

    #[test]
    fn mirrored_footprint() {
        assert_eq!(footprint(&[5, 10], &[-1, 5], 1, 1), (-4, 45));
    }

    #[test]
    fn overlap() {
        assert!(is_non_overlapping(&[5, 10], &[3, 15], 3, 1));
        assert!(!is_non_overlapping(&[5, 10], &[3, 15], 3, 2));
        assert!(!is_non_overlapping(&[5, 10], &[0, 5], 1, 1));
        assert!(is_non_overlapping(&[1, 10], &[0, 5], 1, 1));
    }

    #[test]
    fn simple() {
        assert_eq!(simple_stride(&[5, 10], &[1, 5]), Some((1, 0)));
        assert_eq!(simple_stride(&[5, 10], &[10, -1]), Some((1, -9)));
        assert_eq!(simple_stride(&[5, 10], &[2, 10]), Some((2, 0)));
        assert_eq!(simple_stride(&[5, 10], &[1, 6]), None);
        assert_eq!(simple_stride(&[5, 10], &[0, 1]), None);
        assert_eq!(simple_stride(&[1, 1], &[0, 0]), Some((1, 0)));
    }

    #[test]
    fn dimension_order() {
        assert!(same_dimension_order(&[4, 5], &[1, 4], &[2, 8]));
        assert!(!same_dimension_order(&[4, 5], &[1, 4], &[5, 1]));
        assert!(!same_dimension_order(&[4, 5], &[1, 4], &[-1, 4]));
        assert!(same_dimension_order(&[1, 5], &[7, 1], &[0, 1]));
    }
}
