use rand::distributions::Open01;
use rand::Rng;
use std::ops::AddAssign;

/// Safely compute `log(sum(exp(xs)))`
pub fn logsumexp(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        panic!("Empty container");
    } else if xs.len() == 1 {
        xs[0]
    } else {
        let maxval =
            *xs.iter().max_by(|x, y| x.partial_cmp(y).unwrap()).unwrap();

        xs.iter().fold(0.0, |acc, x| acc + (x - maxval).exp()).ln() + maxval
    }
}

/// Cumulative sum of `xs`
///
/// # Example
///
/// ```rust
/// # use mixfit::misc::cumsum;
/// let xs: Vec<i32> = vec![1, 1, 2, 1];
/// assert_eq!(cumsum(&xs), vec![1, 2, 4, 5]);
/// ```
pub fn cumsum<T>(xs: &[T]) -> Vec<T>
where
    T: AddAssign + Copy + Default,
{
    xs.iter()
        .scan(T::default(), |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

#[inline]
fn binary_search(cws: &[f64], r: f64) -> usize {
    let mut left: usize = 0;
    let mut right: usize = cws.len();
    while left < right {
        let mid = (left + right) / 2;
        if cws[mid] < r {
            left = mid + 1;
        } else {
            right = mid;
        }
    }
    left
}

#[inline]
fn catflip_bisection(cws: &[f64], r: f64) -> Option<usize> {
    let ix = binary_search(cws, r);
    if ix < cws.len() {
        Some(ix)
    } else {
        None
    }
}

#[inline]
fn catflip_standard(cws: &[f64], r: f64) -> Option<usize> {
    cws.iter().position(|&w| w > r)
}

fn catflip(cws: &[f64], r: f64) -> Option<usize> {
    if cws.len() > 9 {
        catflip_bisection(cws, r)
    } else {
        catflip_standard(cws, r)
    }
}

/// Draw a single index in proportion to (unnormalized, non-negative)
/// `weights`.
///
/// If accumulated rounding error exhausts the cumulative scan before an index
/// resolves, the last index wins.
///
/// # Example
///
/// ```rust
/// # use mixfit::misc::pflip;
/// let mut rng = rand::thread_rng();
/// let ix = pflip(&[0.1, 0.7, 0.2], &mut rng);
/// assert!(ix < 3);
/// ```
pub fn pflip<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    if weights.is_empty() {
        panic!("Empty container");
    }
    let cws: Vec<f64> = cumsum(weights);
    let scale: f64 = *cws.last().unwrap();
    let u: f64 = rng.sample(Open01);

    catflip(&cws, u * scale).unwrap_or(weights.len() - 1)
}

/// Weighted average of `xs` under `ws`, renormalized by the total weight.
///
/// The weights need not sum to one; they only need a nonzero sum.
///
/// # Example
///
/// ```rust
/// # use mixfit::misc::barycenter;
/// let c = barycenter(&[1.0, 2.0], &[0.5, 0.5]);
/// assert!((c - 1.5).abs() < 1e-12);
/// ```
pub fn barycenter(xs: &[f64], ws: &[f64]) -> f64 {
    let (num, den) = xs
        .iter()
        .zip(ws.iter())
        .fold((0.0, 0.0), |(num, den), (&x, &w)| {
            (x.mul_add(w, num), den + w)
        });
    num / den
}
