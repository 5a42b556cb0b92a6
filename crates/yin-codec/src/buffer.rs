//! 单调增长的复用缓冲区.
//!
//! 解码器的帧缓冲与采样缓冲在实例生命周期内只增不减,
//! 以避免每次调用重新分配.

/// 只增不减的缓冲区
#[derive(Debug, Clone, Default)]
pub struct GrowBuffer<T> {
    data: Vec<T>,
}

impl<T: Copy + Default> GrowBuffer<T> {
    /// 创建空缓冲区
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// 创建具有初始容量的缓冲区
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: vec![T::default(); capacity],
        }
    }

    /// 确保至少可容纳 `len` 个元素, 返回是否发生了扩容
    pub fn ensure(&mut self, len: usize) -> bool {
        if len <= self.data.len() {
            return false;
        }
        self.data.resize(len, T::default());
        true
    }

    /// 当前容量
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// 前 `len` 个元素的只读视图
    pub fn slice(&self, len: usize) -> &[T] {
        &self.data[..len]
    }

    /// 前 `len` 个元素的可变视图
    pub fn slice_mut(&mut self, len: usize) -> &mut [T] {
        &mut self.data[..len]
    }

    /// 整个缓冲区
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// 整个缓冲区 (可变)
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
