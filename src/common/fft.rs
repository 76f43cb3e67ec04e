//! In-place split-radix complex FFT for power-of-two sizes.
//!
//! Based on the public domain "ffts for RISC" routines by John Green, the
//! classic split-radix formulation combining a radix-2/4 base stage with
//! radix-8 stages. All pointer arithmetic of the original is expressed as
//! signed offsets into plain `f32` slices.

use alloc::boxed::Box;
use alloc::vec::Vec;

/// Transforms with an order above this bust the primary cache and take the
/// recursive path.
const MCACHE: usize = 11 - (core::mem::size_of::<f32>() / 8);

/// An in-place complex FFT of a fixed power-of-two size.
///
/// The twiddle-factor and bit-reversal tables are precomputed at
/// construction, so [`compute`](Fft::compute) performs no allocations and is
/// safe to call from a real time audio thread.
pub struct Fft {
    cos_table: Box<[f32]>,
    bit_rev_table: Box<[usize]>,
    order: usize,
}

impl Fft {
    /// Creates an FFT operating on `2^order` complex values.
    ///
    /// Panics if `order` is outside `[3, 16]`; the permutation tables
    /// degenerate below order 3.
    pub fn new(order: usize) -> Self {
        if order < 3 || order > 16 {
            panic!("FFT order must be between 3 and 16");
        }
        Fft {
            cos_table: cos_table(order),
            bit_rev_table: bit_rev_table(order),
            order,
        }
    }

    /// Transforms `2^order` complex values stored as interleaved re/im pairs,
    /// in place and without normalization (forward transform).
    ///
    /// The buffer must hold at least `2^(order + 1)` floats; anything beyond
    /// that length is left untouched.
    pub fn compute(&self, buffer: &mut [f32]) {
        let io = &mut buffer[..1 << (self.order + 1)];
        bit_reverse_radix2(io, self.order, &self.bit_rev_table);

        let stage_cnt = (self.order - 1) / 3;
        let mut n_diff_u = 2;
        match self.order - 1 - stage_cnt * 3 {
            1 => {
                butterfly_radix2(io, self.order, n_diff_u);
                n_diff_u *= 2;
            }
            2 => {
                butterfly_radix4(io, self.order, n_diff_u);
                n_diff_u *= 4;
            }
            _ => {}
        }

        if self.order <= MCACHE {
            butterfly_stages(io, self.order, &self.cos_table, 1, n_diff_u, stage_cnt);
        } else {
            recurse(io, self.order, &self.cos_table, 1, n_diff_u, stage_cnt);
        }
    }

    /// The log2 of the transform size in complex values.
    pub fn order(&self) -> usize {
        self.order
    }
}

/// Quarter-wave cosine table, `cos(2π i / N)` for `i` in `0..=N/4`, shared by
/// every stage and every recursion depth via strided access.
fn cos_table(order: usize) -> Box<[f32]> {
    let n = 1usize << order;
    (0..=n / 4)
        .map(|i| {
            if i == 0 {
                1.0
            } else if i == n / 4 {
                0.0
            } else {
                libm::cosf(2.0 * core::f32::consts::PI * i as f32 / n as f32)
            }
        })
        .collect::<Vec<_>>()
        .into_boxed_slice()
}

/// Index-permutation table driving the combined bit-reversal / first radix-2
/// stage. One entry per "column root"; the reversal walks two interleaved
/// columns per lookup.
fn bit_rev_table(order: usize) -> Box<[usize]> {
    let root_order = order / 2 - 1;
    let root_count = 1usize << root_order;
    (0..root_count)
        .map(|i| {
            (1..=root_order).fold(0, |sum, bit| {
                if i & (1 << (bit - 1)) != 0 {
                    sum + (root_count >> bit)
                } else {
                    sum
                }
            })
        })
        .collect::<Vec<_>>()
        .into_boxed_slice()
}

/// Bit reverse and first radix-2 stage. Processes two independent rows per
/// table lookup for cache efficiency.
fn bit_reverse_radix2(io: &mut [f32], order: usize, table: &[usize]) {
    let n = 1usize << order;
    let nrems2 = 1usize << ((order + 3) / 2);
    let root_col_inc = n - nrems2;
    let root_1 = (1usize << (order / 2 - 1)) - 1;
    let colstart_shift = (order + 1) / 2 + 1;

    let pos_a = n; // half of the complex values
    let pos_ai = pos_a + 1;
    let pos_b = pos_a + 2;
    let pos_bi = pos_b + 1;

    let mut block = 0;
    while block < nrems2 {
        for colstart in (0..=root_1).rev() {
            let mut icol = root_1;
            let mut p0 = block + root_col_inc + table[colstart] * 4;
            let iop = block + (colstart << colstart_shift);
            let mut p1 = iop + table[icol] * 4;

            let mut f0r = io[p0];
            let mut f0i = io[p0 + 1];
            let mut f1r = io[p0 + pos_a];
            let mut f1i = io[p0 + pos_ai];
            while icol > colstart {
                let f2r = io[p0 + 2];
                let f2i = io[p0 + 3];
                let f3r = io[p0 + pos_b];
                let f3i = io[p0 + pos_bi];
                let f4r = io[p1];
                let f4i = io[p1 + 1];
                let f5r = io[p1 + pos_a];
                let f5i = io[p1 + pos_ai];
                let f6r = io[p1 + 2];
                let f6i = io[p1 + 3];
                let f7r = io[p1 + pos_b];
                let f7i = io[p1 + pos_bi];

                let t0r = f0r + f1r;
                let t0i = f0i + f1i;
                let d1r = f0r - f1r;
                let d1i = f0i - f1i;
                let t1r = f2r + f3r;
                let t1i = f2i + f3i;
                let d3r = f2r - f3r;
                let d3i = f2i - f3i;
                let s0r = f4r + f5r;
                let s0i = f4i + f5i;
                let d5r = f4r - f5r;
                let d5i = f4i - f5i;
                let s2r = f6r + f7r;
                let s2i = f6i + f7i;
                let d7r = f6r - f7r;
                let d7i = f6i - f7i;

                io[p1] = t0r;
                io[p1 + 1] = t0i;
                io[p1 + 2] = d1r;
                io[p1 + 3] = d1i;
                io[p1 + pos_a] = t1r;
                io[p1 + pos_ai] = t1i;
                io[p1 + pos_b] = d3r;
                io[p1 + pos_bi] = d3i;
                io[p0] = s0r;
                io[p0 + 1] = s0i;
                io[p0 + 2] = d5r;
                io[p0 + 3] = d5i;
                io[p0 + pos_a] = s2r;
                io[p0 + pos_ai] = s2i;
                io[p0 + pos_b] = d7r;
                io[p0 + pos_bi] = d7i;

                p0 -= nrems2;
                f0r = io[p0];
                f0i = io[p0 + 1];
                f1r = io[p0 + pos_a];
                f1i = io[p0 + pos_ai];
                icol -= 1;
                p1 = iop + table[icol] * 4;
            }

            let f2r = io[p0 + 2];
            let f2i = io[p0 + 3];
            let f3r = io[p0 + pos_b];
            let f3i = io[p0 + pos_bi];

            let t0r = f0r + f1r;
            let t0i = f0i + f1i;
            let d1r = f0r - f1r;
            let d1i = f0i - f1i;
            let t1r = f2r + f3r;
            let t1i = f2i + f3i;
            let d3r = f2r - f3r;
            let d3i = f2i - f3i;

            io[p0] = t0r;
            io[p0 + 1] = t0i;
            io[p0 + 2] = d1r;
            io[p0 + 3] = d1i;
            io[p0 + pos_a] = t1r;
            io[p0 + pos_ai] = t1i;
            io[p0 + pos_b] = d3r;
            io[p0 + pos_bi] = d3i;
        }
        block += 1 << (order / 2 + 1);
    }
}

/// One radix-2 stage, reducing the remaining stage count to a multiple of
/// three radix-8 stages.
fn butterfly_radix2(io: &mut [f32], order: usize, n_diff_u: usize) {
    let pos = 2;
    let posi = pos + 1;
    let pinc = n_diff_u * 2;
    let pnext = pinc * 4;
    let n_same_u = (1usize << order) / 4 / n_diff_u;

    let mut p0 = 0;
    let mut p1 = pinc;
    let mut p2 = p1 + pinc;
    let mut p3 = p2 + pinc;

    for _ in 0..n_same_u {
        let f0r = io[p0];
        let f1r = io[p1];
        let f0i = io[p0 + 1];
        let f1i = io[p1 + 1];
        let f2r = io[p2];
        let f3r = io[p3];
        let f2i = io[p2 + 1];
        let f3i = io[p3 + 1];

        io[p0] = f0r + f1r;
        io[p0 + 1] = f0i + f1i;
        io[p1] = f0r - f1r;
        io[p1 + 1] = f0i - f1i;
        io[p2] = f2r + f3r;
        io[p2 + 1] = f2i + f3i;
        io[p3] = f2r - f3r;
        io[p3 + 1] = f2i - f3i;

        let f0r = io[p0 + pos];
        let f1i = io[p1 + posi];
        let f0i = io[p0 + posi];
        let f1r = io[p1 + pos];
        let f2r = io[p2 + pos];
        let f3i = io[p3 + posi];
        let f2i = io[p2 + posi];
        let f3r = io[p3 + pos];

        io[p0 + pos] = f0r + f1i;
        io[p0 + posi] = f0i - f1r;
        io[p1 + pos] = f0r - f1i;
        io[p1 + posi] = f0i + f1r;
        io[p2 + pos] = f2r + f3i;
        io[p2 + posi] = f2i - f3r;
        io[p3 + pos] = f2r - f3i;
        io[p3 + posi] = f2i + f3r;

        p0 += pnext;
        p1 += pnext;
        p2 += pnext;
        p3 += pnext;
    }
}

/// One radix-4 stage, same purpose as [`butterfly_radix2`] but for the
/// `(order - 1) mod 3 == 2` case.
fn butterfly_radix4(io: &mut [f32], order: usize, n_diff_u: usize) {
    let w1r = 1.0 / core::f32::consts::SQRT_2; // cos(pi/4)
    let two = 2.0f32;

    let pinc = n_diff_u * 2; // 2 floats per complex
    let pnext = pinc * 4;
    let pnexti = pnext + 1;
    let pos = 2;
    let posi = pos + 1;
    let n_same_u = (1usize << order) / 4 / n_diff_u; // 4 pts per butterfly

    let mut p0 = 0;
    let mut p1 = pinc;
    let mut p2 = p1 + pinc;
    let mut p3 = p2 + pinc;

    let mut f0r = io[p0];
    let mut f1r = io[p1];
    let mut f2r = io[p2];
    let mut f3r = io[p3];
    let mut f0i = io[p0 + 1];
    let mut f1i = io[p1 + 1];
    let mut f2i = io[p2 + 1];
    let mut f3i = io[p3 + 1];

    let mut f5r = f0r - f1r;
    let mut f5i = f0i - f1i;
    f0r += f1r;
    f0i += f1i;

    let mut f6r = f2r + f3r;
    let mut f6i = f2i + f3i;
    f3r = f2r - f3r;
    f3i = f2i - f3i;

    let mut same_u_cnt = n_same_u - 1;
    while same_u_cnt > 0 {
        let mut f7r = f5r - f3i;
        let mut f7i = f5i + f3r;
        f5r += f3i;
        f5i -= f3r;

        let mut f4r = f0r + f6r;
        let mut f4i = f0i + f6i;
        f6r = f0r - f6r;
        f6i = f0i - f6i;

        f2r = io[p2 + pos];
        f2i = io[p2 + posi];
        f1r = io[p1 + pos];
        f1i = io[p1 + posi];
        f3i = io[p3 + posi];
        f0r = io[p0 + pos];
        f3r = io[p3 + pos];
        f0i = io[p0 + posi];

        io[p3] = f7r;
        io[p0] = f4r;
        io[p3 + 1] = f7i;
        io[p0 + 1] = f4i;
        io[p1] = f5r;
        io[p2] = f6r;
        io[p1 + 1] = f5i;
        io[p2 + 1] = f6i;

        f7r = f2r - f3i;
        f7i = f2i + f3r;
        f2r += f3i;
        f2i -= f3r;

        f4r = f0r + f1i;
        f4i = f0i - f1r;
        let t1r = f0r - f1i;
        let t1i = f0i + f1r;

        f5r = t1r - f7r * w1r + f7i * w1r;
        f5i = t1i - f7r * w1r - f7i * w1r;
        f7r = t1r * two - f5r;
        f7i = t1i * two - f5i;

        f6r = f4r - f2r * w1r - f2i * w1r;
        f6i = f4i + f2r * w1r - f2i * w1r;
        f4r = f4r * two - f6r;
        f4i = f4i * two - f6i;

        f3r = io[p3 + pnext];
        f0r = io[p0 + pnext];
        f3i = io[p3 + pnexti];
        f0i = io[p0 + pnexti];
        f2r = io[p2 + pnext];
        f2i = io[p2 + pnexti];
        f1r = io[p1 + pnext];
        f1i = io[p1 + pnexti];

        io[p2 + pos] = f6r;
        io[p1 + pos] = f5r;
        io[p2 + posi] = f6i;
        io[p1 + posi] = f5i;
        io[p3 + pos] = f7r;
        io[p0 + pos] = f4r;
        io[p3 + posi] = f7i;
        io[p0 + posi] = f4i;

        f6r = f2r + f3r;
        f6i = f2i + f3i;
        f3r = f2r - f3r;
        f3i = f2i - f3i;

        f5r = f0r - f1r;
        f5i = f0i - f1i;
        f0r += f1r;
        f0i += f1i;

        p3 += pnext;
        p0 += pnext;
        p1 += pnext;
        p2 += pnext;

        same_u_cnt -= 1;
    }

    let mut f7r = f5r - f3i;
    let mut f7i = f5i + f3r;
    f5r += f3i;
    f5i -= f3r;

    let mut f4r = f0r + f6r;
    let mut f4i = f0i + f6i;
    f6r = f0r - f6r;
    f6i = f0i - f6i;

    f2r = io[p2 + pos];
    f2i = io[p2 + posi];
    f1r = io[p1 + pos];
    f1i = io[p1 + posi];
    f3i = io[p3 + posi];
    f0r = io[p0 + pos];
    f3r = io[p3 + pos];
    f0i = io[p0 + posi];

    io[p3] = f7r;
    io[p0] = f4r;
    io[p3 + 1] = f7i;
    io[p0 + 1] = f4i;
    io[p1] = f5r;
    io[p2] = f6r;
    io[p1 + 1] = f5i;
    io[p2 + 1] = f6i;

    f7r = f2r - f3i;
    f7i = f2i + f3r;
    f2r += f3i;
    f2i -= f3r;

    f4r = f0r + f1i;
    f4i = f0i - f1r;
    let t1r = f0r - f1i;
    let t1i = f0i + f1r;

    f5r = t1r - f7r * w1r + f7i * w1r;
    f5i = t1i - f7r * w1r - f7i * w1r;
    f7r = t1r * two - f5r;
    f7i = t1i * two - f5i;

    f6r = f4r - f2r * w1r - f2i * w1r;
    f6i = f4i + f2r * w1r - f2i * w1r;
    f4r = f4r * two - f6r;
    f4i = f4i * two - f6i;

    io[p2 + pos] = f6r;
    io[p1 + pos] = f5r;
    io[p2 + posi] = f6i;
    io[p1 + posi] = f5i;
    io[p3 + pos] = f7r;
    io[p0 + pos] = f4r;
    io[p3 + posi] = f7i;
    io[p0 + posi] = f4i;
}

/// `stage_cnt` radix-8 stages, with twiddles read from the shared cosine
/// table at stride `u_stride`.
fn butterfly_stages(
    io: &mut [f32],
    order: usize,
    twiddles: &[f32],
    u_stride: usize,
    n_diff_u: usize,
    stage_cnt: usize,
) {
    let n = 1usize << order;
    let two = 2.0f32;

    let mut n_diff_u = n_diff_u;
    let mut pinc = n_diff_u * 2;
    let mut pnext = pinc * 8;
    let mut pos = pinc * 4;
    let mut posi = pos + 1;
    let mut n_same_u = n / 8 / n_diff_u;
    let mut u_inc = (n_same_u * u_stride) as isize;
    let mut u_inc2 = u_inc * 2;
    let mut u_inc4 = u_inc * 4;
    let u2_to_u3 = ((n / 8) * u_stride) as isize;

    for _ in 0..stage_cnt {
        // Twiddle cursors; the imaginary parts are read backwards from the
        // top of the quarter-wave table.
        let mut u0r = 0isize;
        let mut u0i = ((1usize << (order - 2)) * u_stride) as isize;
        let mut u1r = u0r;
        let mut u1i = u0i;
        let mut u2r = u0r;
        let mut u2i = u0i;

        let mut w0r = twiddles[u0r as usize];
        let mut w0i = twiddles[u0i as usize];
        let mut w1r = twiddles[u1r as usize];
        let mut w1i = twiddles[u1i as usize];
        let mut w2r = twiddles[u2r as usize];
        let mut w2i = twiddles[u2i as usize];
        let mut w3r = twiddles[(u2r + u2_to_u3) as usize];
        let mut w3i = twiddles[(u2i - u2_to_u3) as usize];

        let mut pstrt = 0usize;
        let mut p0 = pstrt;
        let mut p1 = pstrt + pinc;
        let mut p2 = p1 + pinc;
        let mut p3 = p2 + pinc;

        let mut diff_u_cnt = n_diff_u;
        while diff_u_cnt > 0 {
            let mut f0r = io[p0];
            let mut f0i = io[p0 + 1];
            let mut f1r = io[p1];
            let mut f1i = io[p1 + 1];

            let mut same_u_cnt = n_same_u - 1;
            while same_u_cnt > 0 {
                let mut f2r = io[p2];
                let mut f2i = io[p2 + 1];
                let mut f3r = io[p3];
                let mut f3i = io[p3 + 1];

                let mut t0r = f0r + f1r * w0r + f1i * w0i;
                let mut t0i = f0i - f1r * w0i + f1i * w0r;
                f1r = f0r * two - t0r;
                f1i = f0i * two - t0i;

                let mut f4r = io[p0 + pos];
                let mut f4i = io[p0 + posi];
                let mut f5r = io[p1 + pos];
                let mut f5i = io[p1 + posi];

                let mut f6r = io[p2 + pos];
                let mut f6i = io[p2 + posi];
                let mut f7r = io[p3 + pos];
                let mut f7i = io[p3 + posi];

                let mut t1r = f2r - f3r * w0r - f3i * w0i;
                let mut t1i = f2i + f3r * w0i - f3i * w0r;
                f2r = f2r * two - t1r;
                f2i = f2i * two - t1i;

                f0r = t0r + f2r * w1r + f2i * w1i;
                f0i = t0i - f2r * w1i + f2i * w1r;
                f2r = t0r * two - f0r;
                f2i = t0i * two - f0i;

                f3r = f1r + t1r * w1i - t1i * w1r;
                f3i = f1i + t1r * w1r + t1i * w1i;
                f1r = f1r * two - f3r;
                f1i = f1i * two - f3i;

                t0r = f4r + f5r * w0r + f5i * w0i;
                t0i = f4i - f5r * w0i + f5i * w0r;
                f5r = f4r * two - t0r;
                f5i = f4i * two - t0i;

                t1r = f6r - f7r * w0r - f7i * w0i;
                t1i = f6i + f7r * w0i - f7i * w0r;
                f6r = f6r * two - t1r;
                f6i = f6i * two - t1i;

                f4r = t0r + f6r * w1r + f6i * w1i;
                f4i = t0i - f6r * w1i + f6i * w1r;
                f6r = t0r * two - f4r;
                f6i = t0i * two - f4i;

                f7r = f5r + t1r * w1i - t1i * w1r;
                f7i = f5i + t1r * w1r + t1i * w1i;
                f5r = f5r * two - f7r;
                f5i = f5i * two - f7i;

                t0r = f0r - f4r * w2r - f4i * w2i;
                t0i = f0i + f4r * w2i - f4i * w2r;
                f0r = f0r * two - t0r;
                f0i = f0i * two - t0i;

                t1r = f1r - f5r * w3r - f5i * w3i;
                t1i = f1i + f5r * w3i - f5i * w3r;
                f1r = f1r * two - t1r;
                f1i = f1i * two - t1i;

                io[p0 + pos] = t0r;
                io[p1 + pos] = t1r;
                io[p0 + posi] = t0i;
                io[p1 + posi] = t1i;
                io[p0] = f0r;
                io[p1] = f1r;
                io[p0 + 1] = f0i;
                io[p1 + 1] = f1i;

                p0 += pnext;
                f0r = io[p0];
                f0i = io[p0 + 1];

                p1 += pnext;
                f1r = io[p1];
                f1i = io[p1 + 1];

                f4r = f2r - f6r * w2i + f6i * w2r;
                f4i = f2i - f6r * w2r - f6i * w2i;
                f6r = f2r * two - f4r;
                f6i = f2i * two - f4i;

                f5r = f3r - f7r * w3i + f7i * w3r;
                f5i = f3i - f7r * w3r - f7i * w3i;
                f7r = f3r * two - f5r;
                f7i = f3i * two - f5i;

                io[p2] = f4r;
                io[p3] = f5r;
                io[p2 + 1] = f4i;
                io[p3 + 1] = f5i;
                io[p2 + pos] = f6r;
                io[p3 + pos] = f7r;
                io[p2 + posi] = f6i;
                io[p3 + posi] = f7i;

                p2 += pnext;
                p3 += pnext;

                same_u_cnt -= 1;
            }

            let mut f2r = io[p2];
            let mut f2i = io[p2 + 1];
            let f3r = io[p3];
            let f3i = io[p3 + 1];

            let mut t0r = f0r + f1r * w0r + f1i * w0i;
            let mut t0i = f0i - f1r * w0i + f1i * w0r;
            f1r = f0r * two - t0r;
            f1i = f0i * two - t0i;

            let mut f4r = io[p0 + pos];
            let mut f4i = io[p0 + posi];
            let mut f5r = io[p1 + pos];
            let mut f5i = io[p1 + posi];

            let mut f6r = io[p2 + pos];
            let mut f6i = io[p2 + posi];
            let mut f7r = io[p3 + pos];
            let mut f7i = io[p3 + posi];

            let mut t1r = f2r - f3r * w0r - f3i * w0i;
            let mut t1i = f2i + f3r * w0i - f3i * w0r;
            f2r = f2r * two - t1r;
            f2i = f2i * two - t1i;

            f0r = t0r + f2r * w1r + f2i * w1i;
            f0i = t0i - f2r * w1i + f2i * w1r;
            f2r = t0r * two - f0r;
            f2i = t0i * two - f0i;

            let mut f3r = f1r + t1r * w1i - t1i * w1r;
            let mut f3i = f1i + t1r * w1r + t1i * w1i;
            f1r = f1r * two - f3r;
            f1i = f1i * two - f3i;

            if diff_u_cnt == n_diff_u / 2 {
                u_inc4 = -u_inc4;
            }

            u0r += u_inc4;
            u0i -= u_inc4;
            u1r += u_inc2;
            u1i -= u_inc2;
            u2r += u_inc;
            u2i -= u_inc;

            pstrt += 2;

            t0r = f4r + f5r * w0r + f5i * w0i;
            t0i = f4i - f5r * w0i + f5i * w0r;
            f5r = f4r * two - t0r;
            f5i = f4i * two - t0i;

            t1r = f6r - f7r * w0r - f7i * w0i;
            t1i = f6i + f7r * w0i - f7i * w0r;
            f6r = f6r * two - t1r;
            f6i = f6i * two - t1i;

            f4r = t0r + f6r * w1r + f6i * w1i;
            f4i = t0i - f6r * w1i + f6i * w1r;
            f6r = t0r * two - f4r;
            f6i = t0i * two - f4i;

            f7r = f5r + t1r * w1i - t1i * w1r;
            f7i = f5i + t1r * w1r + t1i * w1i;
            f5r = f5r * two - f7r;
            f5i = f5i * two - f7i;

            w0r = twiddles[u0r as usize];
            w0i = twiddles[u0i as usize];
            w1r = twiddles[u1r as usize];
            w1i = twiddles[u1i as usize];

            if diff_u_cnt <= n_diff_u / 2 {
                w0r = -w0r;
            }

            t0r = f0r - f4r * w2r - f4i * w2i;
            t0i = f0i + f4r * w2i - f4i * w2r;
            f0r = f0r * two - t0r;
            f0i = f0i * two - t0i;

            f4r = f2r - f6r * w2i + f6i * w2r;
            f4i = f2i - f6r * w2r - f6i * w2i;
            f6r = f2r * two - f4r;
            f6i = f2i * two - f4i;

            io[p0 + pos] = t0r;
            io[p2] = f4r;
            io[p0 + posi] = t0i;
            io[p2 + 1] = f4i;
            w2r = twiddles[u2r as usize];
            w2i = twiddles[u2i as usize];
            io[p0] = f0r;
            io[p2 + pos] = f6r;
            io[p0 + 1] = f0i;
            io[p2 + posi] = f6i;

            p0 = pstrt;
            p2 = pstrt + pinc + pinc;

            t1r = f1r - f5r * w3r - f5i * w3i;
            t1i = f1i + f5r * w3i - f5i * w3r;
            f1r = f1r * two - t1r;
            f1i = f1i * two - t1i;

            f5r = f3r - f7r * w3i + f7i * w3r;
            f5i = f3i - f7r * w3r - f7i * w3i;
            f7r = f3r * two - f5r;
            f7i = f3i * two - f5i;

            io[p1 + pos] = t1r;
            io[p3] = f5r;
            io[p1 + posi] = t1i;
            io[p3 + 1] = f5i;
            w3r = twiddles[(u2r + u2_to_u3) as usize];
            w3i = twiddles[(u2i - u2_to_u3) as usize];
            io[p1] = f1r;
            io[p3 + pos] = f7r;
            io[p1 + 1] = f1i;
            io[p3 + posi] = f7i;

            p1 = pstrt + pinc;
            p3 = p2 + pinc;

            diff_u_cnt -= 1;
        }

        n_same_u /= 8;
        u_inc /= 8;
        u_inc2 /= 8;
        u_inc4 = u_inc * 4;
        n_diff_u *= 8;
        pinc *= 8;
        pnext *= 8;
        pos *= 8;
        posi = pos + 1;
    }
}

/// Splits a transform too large for the cache into eight sub-transforms of
/// one eighth the size, combined by a single radix-8 stage. The twiddle
/// stride is multiplied by 8 per level so one table serves every depth.
fn recurse(
    io: &mut [f32],
    order: usize,
    twiddles: &[f32],
    u_stride: usize,
    n_diff_u: usize,
    stage_cnt: usize,
) {
    if order <= MCACHE {
        butterfly_stages(io, order, twiddles, u_stride, n_diff_u, stage_cnt);
        return;
    }

    let sub_len = 1usize << (order - 2); // floats per eighth
    for chunk in io.chunks_exact_mut(sub_len) {
        recurse(chunk, order - 3, twiddles, 8 * u_stride, n_diff_u, stage_cnt - 1);
    }
    butterfly_stages(io, order, twiddles, u_stride, sub_len / 2, 1);
}

#[cfg(test)]
mod tests {
    use super::Fft;
    use alloc::vec;
    use alloc::vec::Vec;

    /// O(n^2) reference transform, forward and unnormalized like [`Fft`].
    fn naive_dft(input: &[f32]) -> Vec<f32> {
        let n = input.len() / 2;
        let mut output = vec![0.0f32; input.len()];
        for k in 0..n {
            let mut re = 0.0f64;
            let mut im = 0.0f64;
            for j in 0..n {
                let angle = -2.0 * core::f64::consts::PI * ((k * j) % n) as f64 / n as f64;
                let (s, c) = (libm::sin(angle), libm::cos(angle));
                let xr = input[2 * j] as f64;
                let xi = input[2 * j + 1] as f64;
                re += xr * c - xi * s;
                im += xr * s + xi * c;
            }
            output[2 * k] = re as f32;
            output[2 * k + 1] = im as f32;
        }
        output
    }

    #[test]
    fn test_zero_input() {
        let fft = Fft::new(8);
        let mut buffer = vec![0.0f32; 512];
        fft.compute(&mut buffer);
        assert!(buffer.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn test_impulse() {
        // A unit impulse at sample zero transforms to a flat spectrum of ones.
        let order = 10;
        let fft = Fft::new(order);
        let mut buffer = vec![0.0f32; 1 << (order + 1)];
        buffer[0] = 1.0;
        fft.compute(&mut buffer);
        for k in 0..(1 << order) {
            assert!((buffer[2 * k] - 1.0).abs() < 1e-4);
            assert!(buffer[2 * k + 1].abs() < 1e-4);
        }
    }

    #[test]
    fn test_matches_naive_dft() {
        let order = 7;
        let n = 1usize << order;
        let fft = Fft::new(order);

        // Deterministic pseudo-random input.
        let mut state = 0x12345678u32;
        let mut buffer = vec![0.0f32; 2 * n];
        for value in buffer.iter_mut() {
            state = state.wrapping_mul(1664525).wrapping_add(1013904223);
            *value = (state >> 8) as f32 / (1u32 << 23) as f32 - 1.0;
        }

        let expected = naive_dft(&buffer);
        fft.compute(&mut buffer);
        for (actual, reference) in buffer.iter().zip(expected.iter()) {
            assert!((actual - reference).abs() < 1e-2);
        }
    }

    #[test]
    fn test_bin_aligned_cosine_recursive_path() {
        // Order 12 exceeds the cache threshold and takes the recursive path.
        // A real cosine at an exact bin lands at bins k0 and n - k0 with
        // magnitude n / 2.
        let order = 12;
        let n = 1usize << order;
        let k0 = 100usize;
        let fft = Fft::new(order);

        let mut buffer = vec![0.0f32; 2 * n];
        for j in 0..n {
            let angle = 2.0 * core::f64::consts::PI * (k0 * j % n) as f64 / n as f64;
            buffer[2 * j] = libm::cos(angle) as f32;
        }
        fft.compute(&mut buffer);

        let half_n = (n / 2) as f32;
        for k in 0..n {
            let re = buffer[2 * k];
            let im = buffer[2 * k + 1];
            let magnitude = libm::sqrtf(re * re + im * im);
            if k == k0 || k == n - k0 {
                assert!((magnitude - half_n).abs() < 2.0);
            } else {
                assert!(magnitude < 0.5);
            }
        }
    }
}
