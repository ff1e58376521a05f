/// 帧数据结构（RGB 交错，每像素 3 字节）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGB 格式
    pub frame_number: u64,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>, frame_number: u64) -> Self {
        Self {
            width,
            height,
            data,
            frame_number,
        }
    }

    /// 纯色帧（合成输入用）
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], frame_number: u64) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(width, height, data, frame_number)
    }

    pub fn from_rgb_image(image: &image::RgbImage, frame_number: u64) -> Self {
        Self::new(
            image.width(),
            image.height(),
            image.as_raw().clone(),
            frame_number,
        )
    }

    pub fn pixel_count(&self) -> usize {
        (self.width * self.height) as usize
    }

    pub fn is_consistent(&self) -> bool {
        self.pixel_count() > 0 && self.data.len() == self.pixel_count() * 3
    }

    /// 单通道平均值（0 = R, 1 = G, 2 = B）
    pub fn channel_mean(&self, channel: usize) -> f64 {
        debug_assert!(channel < 3);
        let sum: u64 = self
            .data
            .chunks_exact(3)
            .map(|px| px[channel] as u64)
            .sum();
        sum as f64 / self.pixel_count().max(1) as f64
    }

    pub fn mean_rgb(&self) -> [f64; 3] {
        let mut sums = [0u64; 3];
        for px in self.data.chunks_exact(3) {
            sums[0] += px[0] as u64;
            sums[1] += px[1] as u64;
            sums[2] += px[2] as u64;
        }
        let n = self.pixel_count().max(1) as f64;
        [sums[0] as f64 / n, sums[1] as f64 / n, sums[2] as f64 / n]
    }
}

/// 从原生层传递的原始帧数据（YUV420 planar）
#[derive(Debug)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub frame_number: u64,
}

impl RawFrame {
    pub fn has_complete_planes(&self) -> bool {
        let luma = (self.width * self.height) as usize;
        let chroma = (self.width.div_ceil(2) * self.height.div_ceil(2)) as usize;
        self.y_plane.len() >= luma && self.u_plane.len() >= chroma && self.v_plane.len() >= chroma
    }

    pub fn to_rgb(&self) -> Frame {
        let chroma_width = self.width.div_ceil(2);
        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);

        for y in 0..self.height {
            for x in 0..self.width {
                let y_idx = (y * self.width + x) as usize;
                let uv_idx = ((y / 2) * chroma_width + x / 2) as usize;

                let luma = self.y_plane[y_idx] as f32;
                let cb = self.u_plane[uv_idx] as f32 - 128.0;
                let cr = self.v_plane[uv_idx] as f32 - 128.0;

                rgb.push((luma + 1.402 * cr).clamp(0.0, 255.0) as u8);
                rgb.push((luma - 0.344136 * cb - 0.714136 * cr).clamp(0.0, 255.0) as u8);
                rgb.push((luma + 1.772 * cb).clamp(0.0, 255.0) as u8);
            }
        }

        Frame::new(self.width, self.height, rgb, self.frame_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let frame = Frame::filled(10, 8, [10, 20, 30], 7);

        assert_eq!(frame.width, 10);
        assert_eq!(frame.height, 8);
        assert_eq!(frame.pixel_count(), 80);
        assert_eq!(frame.data.len(), 240);
        assert_eq!(frame.frame_number, 7);
        assert!(frame.is_consistent());
    }

    #[test]
    fn test_channel_means() {
        // 2x1: (0, 100, 200) and (10, 50, 0)
        let frame = Frame::new(2, 1, vec![0, 100, 200, 10, 50, 0], 0);

        assert_eq!(frame.channel_mean(0), 5.0);
        assert_eq!(frame.channel_mean(1), 75.0);
        assert_eq!(frame.mean_rgb(), [5.0, 75.0, 100.0]);
    }

    #[test]
    fn test_truncated_frame_is_inconsistent() {
        let frame = Frame::new(4, 4, vec![0u8; 10], 0);
        assert!(!frame.is_consistent());
    }

    #[test]
    fn test_yuv_to_rgb() {
        let width = 64;
        let height = 64;
        let raw_frame = RawFrame {
            width,
            height,
            y_plane: vec![128u8; (width * height) as usize],
            u_plane: vec![128u8; (width * height / 4) as usize],
            v_plane: vec![128u8; (width * height / 4) as usize],
            frame_number: 0,
        };

        assert!(raw_frame.has_complete_planes());
        let frame = raw_frame.to_rgb();
        assert_eq!(frame.width, width);
        assert_eq!(frame.height, height);
        assert_eq!(frame.data.len(), (width * height * 3) as usize);
        // neutral chroma keeps the pixel grey
        assert!(frame.data.iter().all(|&v| v == 128));
    }
}
