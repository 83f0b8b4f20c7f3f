//! Benchmarks the copy engine over different source and destination layouts.
use brunch::Bench;

use nd_image::morphology::{dilation, StructuringElement};
use nd_image::{DataType, Error, Image};

#[derive(Debug, Clone, Copy)]
enum Layout {
    Normal,
    Transposed,
    Mirrored,
}

#[derive(Debug)]
struct CopyCase {
    data_type_in: DataType,
    layout_in: Layout,
    data_type_out: DataType,
    tensor: usize,
    sz: usize,
}

impl CopyCase {
    fn name(&self) -> String {
        format!(
            "copy({}/{:?}, {}, {}x{}, {})",
            self.data_type_in,
            self.layout_in,
            self.data_type_out,
            self.sz,
            self.sz,
            self.tensor
        )
    }

    fn prepare(&self) -> Result<impl FnMut(), Error> {
        let mut from = Image::new(&[self.sz, self.sz], self.tensor, self.data_type_in)?;
        from.fill(17)?;
        match self.layout_in {
            Layout::Normal => {}
            Layout::Transposed => {
                from.swap_dimensions(0, 1)?;
            }
            Layout::Mirrored => {
                from.mirror(0)?;
            }
        }

        let mut into = Image::new(&[self.sz, self.sz], self.tensor, self.data_type_out)?;
        into.protect(true);
        Ok(move || into.copy(&from).unwrap())
    }
}

fn main() {
    let tests = [
        /* same type, only the layout differs */
        CopyCase {
            data_type_in: DataType::UInt8,
            layout_in: Layout::Normal,
            data_type_out: DataType::UInt8,
            tensor: 1,
            sz: 512,
        },
        CopyCase {
            data_type_in: DataType::UInt8,
            layout_in: Layout::Transposed,
            data_type_out: DataType::UInt8,
            tensor: 1,
            sz: 512,
        },
        CopyCase {
            data_type_in: DataType::UInt8,
            layout_in: Layout::Mirrored,
            data_type_out: DataType::UInt8,
            tensor: 1,
            sz: 512,
        },
        CopyCase {
            data_type_in: DataType::UInt8,
            layout_in: Layout::Normal,
            data_type_out: DataType::UInt8,
            tensor: 3,
            sz: 512,
        },
        /* conversions */
        CopyCase {
            data_type_in: DataType::UInt8,
            layout_in: Layout::Normal,
            data_type_out: DataType::SFloat,
            tensor: 1,
            sz: 512,
        },
        CopyCase {
            data_type_in: DataType::SFloat,
            layout_in: Layout::Normal,
            data_type_out: DataType::UInt16,
            tensor: 3,
            sz: 512,
        },
        CopyCase {
            data_type_in: DataType::DComplex,
            layout_in: Layout::Transposed,
            data_type_out: DataType::SFloat,
            tensor: 1,
            sz: 512,
        },
    ];

    let mut benches = brunch::Benches::default();
    benches.extend(tests.map(|copy| {
        let bench = match copy.prepare() {
            Ok(bench) => bench,
            Err(err) => panic!("Failed to setup benchmark {:?}: {:?}", copy, err),
        };

        Bench::new(format!("nd_image::copy::main::{}", copy.name())).run(bench)
    }));

    let mut image = Image::new(&[256, 256], 1, DataType::UInt8).unwrap();
    image.set_sample(&[128, 128], 0, 200).unwrap();
    let element = StructuringElement::elliptic(&[7]);
    benches.extend([
        Bench::new("nd_image::copy::main::dilation(uint8, 256x256, elliptic 7)")
            .run(|| dilation(&image, &element).unwrap()),
    ]);
    benches.finish();
}
