//! Property tests for the layout algebra: operations must preserve the
//! layout's function semantics, not just its printed form.

use moye::tup;
use moye::{
    coalesce, complement, composition, congruent, filter, left_inverse, logical_divide,
    logical_product, make_ordered_layout, right_inverse, Int, IntTuple, Layout, Tiler,
};
use rand::seq::SliceRandom;
use rand::Rng;

fn image(l: &Layout) -> Vec<i64> {
    (0..l.size().value()).map(|i| l.call_1d(i)).collect()
}

/// Compact layout over random dims with a random mode order. Always
/// injective onto [0, size), so every inverse exists.
fn random_permuted_compact(rng: &mut impl Rng) -> Layout {
    let r = rng.gen_range(1..=4);
    let dims: Vec<i64> = (0..r).map(|_| rng.gen_range(1..=4)).collect();
    let mut order: Vec<i64> = (0..r as i64).collect();
    order.shuffle(rng);

    let shape = IntTuple::Tuple(dims.into_iter().map(IntTuple::int).collect());
    let order = IntTuple::Tuple(order.into_iter().map(IntTuple::int).collect());
    make_ordered_layout(shape, &order)
}

#[test]
fn evaluation_agreement_on_random_layouts() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let l = random_permuted_compact(&mut rng);
        for i in 0..l.size().value() {
            let crd = l.get_hier_coord(i);
            assert_eq!(l.call(&crd).value(), l.call_1d(i), "layout {}", l);
        }
    }
}

#[test]
fn coalesce_preserves_function_on_random_layouts() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let l = random_permuted_compact(&mut rng);
        let c = coalesce(&l);
        assert!(congruent(c.shape(), c.stride()));
        assert_eq!(c.size(), l.size(), "layout {}", l);
        assert_eq!(image(&c), image(&l), "layout {}", l);
    }
}

#[test]
fn composition_law_on_reshapes() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let a = random_permuted_compact(&mut rng);
        // reshape B: column-major identity regrouping A's own extents, so
        // every skip and take in the composition divides exactly
        let dims: Vec<i64> = a.shape().flatten().iter().map(|v| v.value()).collect();
        let split = rng.gen_range(0..=dims.len());
        let k: i64 = dims[..split].iter().product();
        let rest: i64 = dims[split..].iter().product();
        let b = Layout::col_major(tup!(k, rest));

        let r = composition(&a, &b).unwrap();
        for i in 0..b.size().value() {
            assert_eq!(r.call_1d(i), a.call_1d(b.call_1d(i)), "{} ∘ {}", a, b);
        }
    }
}

#[test]
fn composition_is_associative() {
    let a = Layout::new(tup!(12), tup!(1));
    let b = Layout::new(tup!(4), tup!(3));
    let c = Layout::new(tup!(2), tup!(2));

    let ab_c = composition(&composition(&a, &b).unwrap(), &c).unwrap();
    let a_bc = composition(&a, &composition(&b, &c).unwrap()).unwrap();
    assert_eq!(image(&ab_c), image(&a_bc));
}

#[test]
fn complement_is_disjoint_and_covers() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let s = rng.gen_range(1..=5i64);
        let d = [1i64, 2, 4].choose(&mut rng).copied().unwrap();
        let k = rng.gen_range(1..=3i64);
        let m = s * d * k;

        let l = Layout::new(tup!(s), tup!(d));
        let c = complement(&l, Int::st(m)).unwrap();

        let mut seen = vec![false; m as usize];
        for i in 0..l.size().value() {
            for j in 0..c.size().value() {
                let pos = (l.call_1d(i) + c.call_1d(j)) as usize;
                assert!(!seen[pos], "{} and its complement overlap at {}", l, pos);
                seen[pos] = true;
            }
        }
        assert!(seen.iter().all(|&b| b), "{} with complement {} misses a position", l, c);
    }
}

#[test]
fn right_inverse_is_a_right_identity() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let l = random_permuted_compact(&mut rng);
        let inv = right_inverse(&l);
        for i in 0..inv.size().value() {
            assert_eq!(l.call_1d(inv.call_1d(i)), i, "layout {}", l);
        }
    }
}

#[test]
fn left_inverse_undoes_the_layout() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let l = random_permuted_compact(&mut rng);
        let inv = left_inverse(&l).unwrap();
        for i in 0..l.size().value() {
            assert_eq!(inv.call_1d(l.call_1d(i)), i, "layout {}", l);
        }
    }
}

#[test]
fn divide_preserves_the_element_set() {
    let mut rng = rand::thread_rng();
    for _ in 0..50 {
        let l = random_permuted_compact(&mut rng);
        // tile over a prefix of the layout's own extents
        let dims: Vec<i64> = l.shape().flatten().iter().map(|v| v.value()).collect();
        let split = rng.gen_range(0..=dims.len());
        let k: i64 = dims[..split].iter().product();
        let tiler = Tiler::from(Layout::col_major(tup!(k)));

        let d = logical_divide(&l, &tiler).unwrap();
        let mut a = image(&l);
        let mut b = image(&d);
        a.sort();
        b.sort();
        assert_eq!(a, b, "dividing {} by {} lost elements", l, k);
    }
}

#[test]
fn product_then_divide_restores_structure() {
    let tile = Layout::col_major(tup!(2, 2));
    let reps = Layout::new(tup!(6), tup!(1));

    let p = logical_product(&tile, &reps).unwrap();
    assert_eq!(p.size(), 24);
    assert_eq!(p.mode(0).size(), tile.size());
    assert_eq!(p.mode(1).size(), reps.size());

    let d = logical_divide(&p, &Tiler::from(tile.clone())).unwrap();
    assert_eq!(d.mode(0).size(), tile.size());
    assert_eq!(d.mode(1).size(), reps.size());
}

#[test]
fn filter_keeps_the_reachable_image() {
    let l = Layout::new(tup!(4, 3), tup!(0, 2));
    let f = filter(&l);
    assert_eq!(f.to_string(), "_3:_2");
    // the filtered layout walks the distinct addresses of the original
    let mut orig: Vec<i64> = image(&l);
    orig.sort();
    orig.dedup();
    assert_eq!(image(&f), orig);
}
