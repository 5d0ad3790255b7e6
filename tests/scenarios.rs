//! End-to-end checks of the layout algebra against worked examples,
//! following the CuTe layout-algebra documentation cases.

use moye::{
    blocked_product, coalesce, coalesce_profile, complement, composition, congruent,
    local_partition, local_tile, logical_product, raked_product, upcast, zipped_divide,
    ArrayEngine, Crd, Int, IntTuple, Layout, MoYeArray, Tiler,
};
use moye::tup;
use rstest::rstest;

fn check_layout(l: &Layout, expect_static: bool) {
    assert!(congruent(l.shape(), l.stride()), "congruence violated by {}", l);
    let leaves: i64 = l.shape().flatten().iter().map(|v| v.value()).product();
    assert_eq!(l.size().value(), leaves);
    if expect_static {
        assert!(l.is_static(), "static inputs must give a static layout: {}", l);
    }
}

fn image(l: &Layout) -> Vec<i64> {
    (0..l.size().value()).map(|i| l.call_1d(i)).collect()
}

#[test]
fn s1_hierarchical_evaluation() {
    let l = Layout::new(tup!(2, tup!(2, 2)), tup!(4, tup!(1, 2)));
    check_layout(&l, true);
    assert_eq!(image(&l), [0, 4, 1, 5, 2, 6, 3, 7]);
}

#[test]
fn s2_coalesce_preserves_function() {
    let l = Layout::new(tup!(2, tup!(1, 6)), tup!(1, tup!(6, 2)));
    let c = coalesce(&l);
    check_layout(&c, true);
    assert_eq!(c.size(), l.size());
    assert_eq!(c.size(), 12);
    assert_eq!(image(&c), image(&l));
    assert_eq!(c.cosize(), 12);

    // per-mode coalesce keeps the rank-2 boundary
    let p = coalesce_profile(&l, &tup!(1, 1));
    assert_eq!(p.to_string(), "(_2,_6):(_1,_2)");
    assert_eq!(image(&p), image(&l));
}

#[rstest]
#[case(
    Layout::new(tup!(20), tup!(2)),
    Layout::new(tup!(4, 5), tup!(1, 4)),
    "(_4,_5):(_2,_8)"
)]
#[case(
    Layout::new(tup!(6, 2), tup!(8, 2)),
    Layout::new(tup!(4, 3), tup!(3, 1)),
    "((_2,_2),_3):((_24,_2),_8)"
)]
#[case(
    Layout::new(tup!(10, 2), tup!(16, 4)),
    Layout::new(tup!(5, 4), tup!(1, 5)),
    "(_5,(_2,_2)):(_16,(_80,_4))"
)]
fn s3_composition(#[case] a: Layout, #[case] b: Layout, #[case] expected: &str) {
    let r = composition(&a, &b).unwrap();
    check_layout(&r, true);
    assert_eq!(r.to_string(), expected);
    for i in 0..b.size().value() {
        assert_eq!(r.call_1d(i), a.call_1d(b.call_1d(i)), "mismatch at {}", i);
    }
}

#[test]
fn s4_complement_of_dense_prefix() {
    let l = Layout::new(tup!(4), tup!(1));
    let c = complement(&l, Int::st(24)).unwrap();
    check_layout(&c, true);
    assert_eq!(c.to_string(), "_6:_4");
}

#[test]
fn s5_complement_covers_the_gaps() {
    let l = Layout::new(tup!(6), tup!(4));
    let c = complement(&l, Int::st(24)).unwrap();
    check_layout(&c, true);
    let mut img = image(&c);
    img.sort();
    assert_eq!(img, [0, 1, 2, 3]);
}

#[test]
fn s6_logical_product() {
    let a = Layout::new(tup!(2, 2), tup!(1, 2));
    let b = Layout::new(tup!(3, 4), tup!(4, 1));
    let p = logical_product(&a, &b).unwrap();
    check_layout(&p, true);
    assert_eq!(p.shape().to_string(), "((_2,_2),(_3,_4))");
    assert_eq!(p.stride().to_string(), "((_1,_2),(_16,_4))");
}

#[test]
fn s7_blocked_product() {
    let a = Layout::col_major(tup!(2, 2));
    let b = Layout::new(tup!(3, 4), tup!(4, 1));
    let p = blocked_product(&a, &b, false).unwrap();
    check_layout(&p, true);
    assert_eq!(p.shape().to_string(), "((_2,_3),(_2,_4))");
    assert_eq!(p.stride().to_string(), "((_1,_16),(_2,_4))");
}

#[test]
fn s8_zipped_divide() {
    let l = Layout::new(
        tup!(tup!(3, 2), tup!(4, 2)),
        tup!(tup!(16, 1), tup!(4, 2)),
    );
    let t = Tiler::Tuple(vec![
        Tiler::Leaf(Layout::new(tup!(2), tup!(3))),
        Tiler::Leaf(Layout::new(tup!(2), tup!(4))),
    ]);
    let z = zipped_divide(&l, &t).unwrap();
    check_layout(&z, true);
    assert_eq!(z.shape().to_string(), "((_2,_2),(_3,_4))");
    assert_eq!(z.stride().to_string(), "((_1,_2),(_16,_4))");
}

#[test]
fn s8_raked_product_produces_the_divided_layout() {
    // the S8 input is the raked product of the S6 operands
    let a = Layout::new(tup!(2, 2), tup!(1, 2));
    let b = Layout::new(tup!(3, 4), tup!(4, 1));
    let r = raked_product(&a, &b, false).unwrap();
    assert_eq!(r.shape().to_string(), "((_3,_2),(_4,_2))");
    assert_eq!(r.stride().to_string(), "((_16,_1),(_4,_2))");
}

#[test]
fn s9_recast_to_narrower_elements() {
    let layout = Layout::new(tup!(2, 3), tup!(1, 2));
    let data: [i32; 6] = std::array::from_fn(|i| i as i32);
    let a = MoYeArray::<ArrayEngine<i32, 6>>::from_data(data, layout);

    let h = a.recast::<i16>().unwrap();
    check_layout(h.layout(), true);
    assert_eq!(h.layout().to_string(), "(_4,_3):(_1,_4)");
    // both views span the same 24 bytes
    assert_eq!(a.layout().cosize().value() * 4, h.layout().cosize().value() * 2);
}

#[test]
fn s10_upcast_shrinks_the_unit_mode() {
    let l = Layout::new(tup!(2, 4), tup!(1, 2));
    let u = upcast(&l, 2).unwrap();
    check_layout(&u, true);
    assert_eq!(u.to_string(), "(_1,_4):(_1,_1)");
    // byte images coincide: 8 elements ⤳ 4 doubled elements
    assert_eq!(l.cosize().value(), 2 * u.cosize().value());
}

#[test]
fn static_inputs_stay_static_through_the_algebra() {
    let a = Layout::new(tup!(6, 2), tup!(8, 2));
    let b = Layout::new(tup!(4, 3), tup!(3, 1));
    assert!(composition(&a, &b).unwrap().is_static());
    assert!(coalesce(&a).is_static());
    assert!(complement(&Layout::new(tup!(4), tup!(1)), Int::st(24))
        .unwrap()
        .is_static());

    // one dynamic leaf poisons the result
    let d = Layout::new(
        IntTuple::Tuple(vec![IntTuple::leaf(Int::dy(6)), IntTuple::int(2)]),
        tup!(8, 2),
    );
    assert!(!coalesce(&d).is_static());
}

#[test]
fn thread_block_partitioning_end_to_end() {
    // a 8x8 column-major tensor, 4x4 tiles, 2x2 threads
    let data: [i32; 64] = std::array::from_fn(|i| i as i32);
    let a = MoYeArray::<ArrayEngine<i32, 64>>::from_data(data, Layout::col_major(tup!(8, 8)));

    let tile = local_tile(&a, &tup!(4, 4), &tup!(1, 1)).unwrap();
    assert_eq!(tile.layout().size(), 16);
    // tile (1,1) starts at row 4, column 4: linear 4 + 4*8
    assert_eq!(tile[0], 36);

    let thr = Layout::col_major(tup!(2, 2));
    let mut seen = vec![0u32; 16];
    for tid in 0..4 {
        let part = local_partition(&tile, &thr, tid).unwrap();
        assert_eq!(part.layout().size(), 4);
        for k in 0..part.layout().size().value() {
            let v = part[k as usize] - 36;
            let col = v / 8;
            let row = v % 8;
            seen[(row + 4 * col) as usize] += 1;
        }
    }
    assert!(seen.iter().all(|&c| c == 1), "threads must cover the tile once");
}

#[test]
fn slicing_matches_partition_offsets() {
    let l = Layout::col_major(tup!(4, 5));
    let (col, off) = l.slice_and_offset(&Crd::Tuple(vec![Crd::Wild, Crd::idx(3)]));
    assert_eq!(off, 12);
    assert_eq!(col.to_string(), "_4:_1");
}
